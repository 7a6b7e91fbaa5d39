//! Application state shared across handlers.

use std::sync::Arc;

use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::kv::{JsonStore, StoreError};
use crate::services::{ServiceabilityChecker, ServiceabilityError, UploadError, UploadStore};

/// Errors that can occur while building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open data directory: {0}")]
    Store(#[from] StoreError),
    #[error("failed to open upload directory: {0}")]
    Uploads(#[from] UploadError),
    #[error("invalid serviceability configuration: {0}")]
    Serviceability(#[from] ServiceabilityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the document store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: JsonStore,
    uploads: UploadStore,
    checker: ServiceabilityChecker,
}

impl AppState {
    /// Open the data and upload directories named in `config` and build the
    /// serviceability checker.
    ///
    /// # Errors
    ///
    /// Returns `StateError` if a directory cannot be created or the checker
    /// cannot be built.
    pub async fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let store = JsonStore::open(&config.data_dir).await?;
        let uploads = UploadStore::open(&config.upload_dir).await?;
        let checker = ServiceabilityChecker::from_config(&config.serviceability)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                uploads,
                checker,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &JsonStore {
        &self.inner.store
    }

    /// Get a reference to the upload directory.
    #[must_use]
    pub fn uploads(&self) -> &UploadStore {
        &self.inner.uploads
    }

    /// Get a reference to the serviceability checker.
    #[must_use]
    pub fn checker(&self) -> &ServiceabilityChecker {
        &self.inner.checker
    }
}
