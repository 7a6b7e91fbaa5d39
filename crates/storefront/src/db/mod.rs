//! Repositories over the marketplace document store.
//!
//! Each repository owns one collection key in [`JsonStore`]. Reads go straight
//! to the store and never fail. Writes come in two forms:
//!
//! - a plain method (`insert`, `delete`, ...) that commits on its own
//! - a `stage_*` method that adds the write to a caller's [`Batch`], so a
//!   service can commit several collections together
//!
//! Plain methods, and services that stage into a batch, open it with
//! [`JsonStore::write`] before reading, so overlapping writers queue on the
//! store's writer gate. Staged writes still pin the revision the collection
//! was read at: a write that bypasses the gate turns the commit into
//! `StoreError::StaleWrite` instead of a lost update.

pub mod cart;
pub mod catalog;
pub mod donations;
pub mod listings;
pub mod orders;
pub mod user_products;
pub mod users;
pub mod wishlist;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::kv::{Batch, JsonStore, StoreError};

pub use cart::CartRepository;
pub use catalog::{CatalogInput, CatalogRepository};
pub use donations::DonationRepository;
pub use listings::{ListingFilter, ListingRepository};
pub use orders::OrderRepository;
pub use user_products::UserProductRepository;
pub use users::UserRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The underlying store rejected the write.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Record not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict (e.g., duplicate unique field).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A required field is missing or malformed.
    #[error("invalid: {0}")]
    Invalid(String),

    /// The product has no stock left to add.
    #[error("out of stock: {0}")]
    OutOfStock(String),
}

/// A collection read together with the revision it was read at.
pub(crate) struct Snapshot<T> {
    key: &'static str,
    revision: u64,
    pub items: Vec<T>,
}

impl<T: DeserializeOwned + serde::Serialize> Snapshot<T> {
    pub(crate) async fn read(store: &JsonStore, key: &'static str) -> Self {
        let revision = store.revision(key).await;
        let items = store.load(key).await;
        Self {
            key,
            revision,
            items,
        }
    }

    /// Stage the (modified) items, pinned to the revision they were read at.
    pub(crate) fn stage(&self, batch: &mut Batch<'_>) -> Result<(), RepositoryError> {
        batch
            .expect_revision(self.key, self.revision)
            .put(self.key, &self.items)?;
        Ok(())
    }
}

/// Commit a batch holding a single repository's writes.
pub(crate) async fn commit(batch: Batch<'_>) -> Result<(), RepositoryError> {
    batch.commit().await?;
    Ok(())
}
