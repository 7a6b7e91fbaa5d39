//! Subcommand implementations.
//!
//! Every command works on the data directory opened by [`Context::open`].
//! Results are reported through `tracing`.

pub mod account;
pub mod donate;
pub mod listing;
pub mod orders;
pub mod shop;

use std::path::Path;

use thiserror::Error;

use recraft_storefront::config::StorefrontConfig;
use recraft_storefront::kv::{JsonStore, StoreError};
use recraft_storefront::services::uploads::content_type_for;
use recraft_storefront::services::{
    ServiceabilityChecker, ServiceabilityError, SessionContext, UploadError, UploadStore,
};

pub use account::AccountAction;
pub use donate::DonateArgs;
pub use listing::ListingAction;
pub use orders::OrdersAction;
pub use shop::{CartAction, CatalogAction, WishlistAction};

/// Errors from setting up a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to open data directory: {0}")]
    Store(#[from] StoreError),

    #[error("failed to store upload: {0}")]
    Upload(#[from] UploadError),

    #[error("serviceability lookup failed: {0}")]
    Serviceability(#[from] ServiceabilityError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Usage(String),
}

/// A file copied into the upload directory.
pub struct StoredFile {
    pub reference: String,
    pub content_type: &'static str,
    pub size_bytes: u64,
}

/// Everything a command needs from the data directory.
pub struct Context {
    pub session: SessionContext,
    pub uploads: UploadStore,
    pub checker: ServiceabilityChecker,
}

impl Context {
    /// Open the data and upload directories named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` if a directory cannot be created or the
    /// serviceability checker cannot be built.
    pub async fn open(config: &StorefrontConfig) -> Result<Self, CommandError> {
        let store = JsonStore::open(&config.data_dir).await?;
        let uploads = UploadStore::open(&config.upload_dir).await?;
        let checker = ServiceabilityChecker::from_config(&config.serviceability)?;
        tracing::debug!(data_dir = %config.data_dir.display(), "data directory opened");

        Ok(Self {
            session: SessionContext::new(store),
            uploads,
            checker,
        })
    }

    /// The store behind the session.
    pub const fn store(&self) -> &JsonStore {
        self.session.store()
    }

    /// Copy a local file into the upload directory.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Read` if the file cannot be read, or
    /// `CommandError::Upload` if it cannot be stored.
    pub async fn store_file(&self, path: &Path) -> Result<StoredFile, CommandError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let reference = self.uploads.save(name, &bytes).await?;

        Ok(StoredFile {
            reference,
            content_type: content_type_for(name),
            size_bytes: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_file_copies_into_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::open(&StorefrontConfig::local(dir.path().join("data")))
            .await
            .unwrap();

        let photo = dir.path().join("planter.webp");
        tokio::fs::write(&photo, b"webp bytes").await.unwrap();

        let stored = ctx.store_file(&photo).await.unwrap();
        assert!(stored.reference.starts_with("/uploads/"));
        assert_eq!(stored.content_type, "image/webp");
        assert_eq!(stored.size_bytes, 10);

        let missing = ctx.store_file(&dir.path().join("nope.png")).await;
        assert!(matches!(missing, Err(CommandError::Read { .. })));
    }
}
