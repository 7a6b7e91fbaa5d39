//! Artisan catalog repository backing `/api/products`.

use chrono::Utc;

use recraft_core::{CatalogProductId, Price};

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{JsonStore, keys};
use crate::models::CatalogProduct;

/// Fields accepted when creating or updating a catalog product.
#[derive(Debug, Clone, Default)]
pub struct CatalogInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub artisan: Option<String>,
    pub image: Option<String>,
}

/// Repository for catalog documents.
pub struct CatalogRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All catalog products in creation order.
    pub async fn all(&self) -> Vec<CatalogProduct> {
        self.store.load(keys::CATALOG).await
    }

    /// Get a product by id.
    pub async fn get(&self, id: &CatalogProductId) -> Option<CatalogProduct> {
        self.all().await.into_iter().find(|p| &p.id == id)
    }

    /// Create a product. Title, price and artisan are required.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` naming the first missing required
    /// field, or `RepositoryError::Storage` if the write fails.
    pub async fn create(&self, input: CatalogInput) -> Result<CatalogProduct, RepositoryError> {
        let title = required(input.title, "title")?;
        let price = input.price.ok_or_else(|| missing("price"))?;
        let artisan = required(input.artisan, "artisan")?;
        let now = Utc::now();

        let product = CatalogProduct {
            id: CatalogProductId::generate(),
            title,
            description: input.description,
            price,
            image: input.image,
            artisan,
            created_at: now,
            updated_at: now,
        };

        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CatalogProduct>::read(self.store, keys::CATALOG).await;
        snapshot.items.push(product.clone());
        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(product)
    }

    /// Apply the fields present in `input` to an existing product.
    ///
    /// Returns `None` if no product has that id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn update(
        &self,
        id: &CatalogProductId,
        input: CatalogInput,
    ) -> Result<Option<CatalogProduct>, RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CatalogProduct>::read(self.store, keys::CATALOG).await;
        let Some(product) = snapshot.items.iter_mut().find(|p| &p.id == id) else {
            return Ok(None);
        };

        if let Some(title) = input.title.filter(|t| !t.trim().is_empty()) {
            product.title = title;
        }
        if let Some(description) = input.description {
            product.description = Some(description);
        }
        if let Some(price) = input.price {
            product.price = price;
        }
        if let Some(artisan) = input.artisan.filter(|a| !a.trim().is_empty()) {
            product.artisan = artisan;
        }
        if let Some(image) = input.image {
            product.image = Some(image);
        }
        product.updated_at = Utc::now();
        let updated = product.clone();

        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(Some(updated))
    }

    /// Delete a product. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn delete(&self, id: &CatalogProductId) -> Result<bool, RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CatalogProduct>::read(self.store, keys::CATALOG).await;
        let before = snapshot.items.len();
        snapshot.items.retain(|p| &p.id != id);
        if snapshot.items.len() == before {
            return Ok(false);
        }
        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(true)
    }
}

fn missing(field: &str) -> RepositoryError {
    RepositoryError::Invalid(format!("{field} is required"))
}

fn required(value: Option<String>, field: &str) -> Result<String, RepositoryError> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| missing(field))
}
