//! Repository for storefront products created by sellers.
//!
//! Each listing owns at most one product. Linking a product to a listing that
//! already has one replaces it, so lookups by listing id are unambiguous.
//! Patches still fan out to every match to repair data written before that
//! rule existed.

use recraft_core::{ListingId, Price, ProductId};

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::product::seed_catalog;
use crate::models::{Listing, Product};

/// Repository for seller-created storefront products.
pub struct UserProductRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> UserProductRepository<'a> {
    /// Create a new user product repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All seller-created products, oldest first.
    pub async fn all(&self) -> Vec<Product> {
        self.store.load(keys::USER_PRODUCTS).await
    }

    /// The demo catalog followed by every seller-created product.
    pub async fn storefront(&self) -> Vec<Product> {
        let mut products = seed_catalog();
        products.extend(self.all().await);
        products
    }

    /// Find a storefront product (demo or seller-created) by id.
    pub async fn get(&self, id: ProductId) -> Option<Product> {
        self.storefront().await.into_iter().find(|p| p.id == id)
    }

    /// The first product linked to `listing_id`.
    pub async fn find_by_listing_id(&self, listing_id: &ListingId) -> Option<Product> {
        self.all()
            .await
            .into_iter()
            .find(|p| p.listing_id.as_ref() == Some(listing_id))
    }

    /// The id one above the highest in use across the whole storefront.
    pub async fn next_id(&self) -> ProductId {
        self.storefront()
            .await
            .iter()
            .map(|p| p.id)
            .max()
            .map_or(ProductId::new(1), ProductId::next)
    }

    /// Append a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn add(&self, product: Product) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        self.stage_link(&mut batch, product).await?;
        commit(batch).await
    }

    /// Stage an append, replacing any product already linked to the same
    /// listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub async fn stage_link(
        &self,
        batch: &mut Batch<'_>,
        product: Product,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<Product>::read(self.store, keys::USER_PRODUCTS).await;
        if let Some(listing_id) = &product.listing_id {
            snapshot
                .items
                .retain(|p| p.listing_id.as_ref() != Some(listing_id));
        }
        snapshot.items.push(product);
        snapshot.stage(batch)
    }

    /// Remove every product linked to `listing_id`.
    ///
    /// Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn remove_by_listing_id(&self, listing_id: &ListingId) -> Result<usize, RepositoryError> {
        let mut batch = self.store.write().await;
        let removed = self.stage_remove_by_listing_id(&mut batch, listing_id).await?;
        commit(batch).await?;
        Ok(removed)
    }

    /// Stage removal of every product linked to `listing_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub async fn stage_remove_by_listing_id(
        &self,
        batch: &mut Batch<'_>,
        listing_id: &ListingId,
    ) -> Result<usize, RepositoryError> {
        let mut snapshot = Snapshot::<Product>::read(self.store, keys::USER_PRODUCTS).await;
        let before = snapshot.items.len();
        snapshot
            .items
            .retain(|p| p.listing_id.as_ref() != Some(listing_id));
        let removed = before - snapshot.items.len();
        if removed > 0 {
            snapshot.stage(batch)?;
        }
        Ok(removed)
    }

    /// Stage a patch of every product linked to `listing`: name, display
    /// price, stock and (when given) image.
    ///
    /// Returns how many products were patched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub async fn stage_patch_for_listing(
        &self,
        batch: &mut Batch<'_>,
        listing: &Listing,
        image: Option<&str>,
    ) -> Result<usize, RepositoryError> {
        let mut snapshot = Snapshot::<Product>::read(self.store, keys::USER_PRODUCTS).await;
        let price = Price::from_rupees(i64::try_from(listing.price).unwrap_or(i64::MAX)).display();

        let mut patched = 0;
        for product in snapshot
            .items
            .iter_mut()
            .filter(|p| p.listing_id.as_ref() == Some(&listing.id))
        {
            product.name.clone_from(&listing.title);
            product.price.clone_from(&price);
            product.stock = listing.stock;
            if let Some(image) = image {
                image.clone_into(&mut product.image);
            }
            patched += 1;
        }

        if patched > 0 {
            snapshot.stage(batch)?;
        }
        Ok(patched)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: u64, listing: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            image: String::new(),
            price: "₹100".to_owned(),
            quality: "New".to_owned(),
            location: "Pune".to_owned(),
            description: "Upcycled item".to_owned(),
            rating: 0.0,
            stock: 2,
            listing_id: listing.map(ListingId::new),
        }
    }

    #[tokio::test]
    async fn test_next_id_starts_after_demo_catalog() {
        let store = JsonStore::memory();
        let repo = UserProductRepository::new(&store);
        assert_eq!(repo.next_id().await, ProductId::new(7));
        repo.add(product(7, Some("a"))).await.unwrap();
        assert_eq!(repo.next_id().await, ProductId::new(8));
    }

    #[tokio::test]
    async fn test_link_replaces_existing_product_for_listing() {
        let store = JsonStore::memory();
        let repo = UserProductRepository::new(&store);
        repo.add(product(7, Some("a"))).await.unwrap();
        repo.add(product(8, Some("b"))).await.unwrap();
        repo.add(product(9, Some("a"))).await.unwrap();

        let all = repo.all().await;
        assert_eq!(all.len(), 2);
        let linked = repo.find_by_listing_id(&ListingId::new("a")).await.unwrap();
        assert_eq!(linked.id, ProductId::new(9));
    }

    #[tokio::test]
    async fn test_remove_by_listing_leaves_others() {
        let store = JsonStore::memory();
        // Legacy data with two products on one listing.
        store
            .save(
                keys::USER_PRODUCTS,
                &[product(7, Some("a")), product(8, Some("a")), product(9, None)],
            )
            .await
            .unwrap();
        let repo = UserProductRepository::new(&store);

        let removed = repo.remove_by_listing_id(&ListingId::new("a")).await.unwrap();
        assert_eq!(removed, 2);
        let rest = repo.all().await;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, ProductId::new(9));
    }

    #[tokio::test]
    async fn test_get_finds_demo_and_user_products() {
        let store = JsonStore::memory();
        let repo = UserProductRepository::new(&store);
        repo.add(product(7, None)).await.unwrap();
        assert_eq!(repo.get(ProductId::new(2)).await.unwrap().name, "Boho Coco Shells");
        assert_eq!(repo.get(ProductId::new(7)).await.unwrap().name, "Item 7");
        assert!(repo.get(ProductId::new(99)).await.is_none());
    }
}
