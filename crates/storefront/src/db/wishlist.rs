//! Wishlist repository.

use recraft_core::ProductId;

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{JsonStore, keys};
use crate::models::Product;

/// Repository for saved products. Unique by product id.
pub struct WishlistRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// Saved products.
    pub async fn items(&self) -> Vec<Product> {
        self.store.load(keys::WISHLIST).await
    }

    /// Whether a product is saved.
    pub async fn contains(&self, id: ProductId) -> bool {
        self.items().await.iter().any(|p| p.id == id)
    }

    /// Save a product. Returns `false` if it was already saved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn add(&self, product: Product) -> Result<bool, RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<Product>::read(self.store, keys::WISHLIST).await;
        if snapshot.items.iter().any(|p| p.id == product.id) {
            return Ok(false);
        }
        snapshot.items.push(product);
        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(true)
    }

    /// Remove a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn remove(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<Product>::read(self.store, keys::WISHLIST).await;
        snapshot.items.retain(|p| p.id != id);
        snapshot.stage(&mut batch)?;
        commit(batch).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::product::seed_catalog;

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let store = JsonStore::memory();
        let wishlist = WishlistRepository::new(&store);
        let pen_stand = seed_catalog().remove(5);

        assert!(wishlist.add(pen_stand.clone()).await.unwrap());
        assert!(!wishlist.add(pen_stand.clone()).await.unwrap());
        assert_eq!(wishlist.items().await.len(), 1);
        assert!(wishlist.contains(pen_stand.id).await);

        wishlist.remove(pen_stand.id).await.unwrap();
        assert!(!wishlist.contains(pen_stand.id).await);
    }
}
