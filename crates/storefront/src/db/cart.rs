//! Cart repository.
//!
//! Every write keeps each line's quantity within `1..=product.stock`.

use recraft_core::{Price, ProductId};

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::{CartItem, Product};

/// Repository for the shopping cart.
pub struct CartRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// Cart lines in the order they were added.
    pub async fn items(&self) -> Vec<CartItem> {
        self.store.load(keys::CART).await
    }

    /// Add `qty` of `product`, merging with an existing line.
    ///
    /// Returns the resulting line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::OutOfStock` if the product has no stock.
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn add(&self, product: Product, qty: u32) -> Result<CartItem, RepositoryError> {
        if product.stock == 0 {
            return Err(RepositoryError::OutOfStock(product.name));
        }

        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CartItem>::read(self.store, keys::CART).await;
        let line = if let Some(line) = snapshot
            .items
            .iter_mut()
            .find(|c| c.product.id == product.id)
        {
            line.qty = clamp_qty(line.qty.saturating_add(qty), product.stock);
            line.product = product;
            line.clone()
        } else {
            let line = CartItem {
                qty: clamp_qty(qty, product.stock),
                product,
            };
            snapshot.items.push(line.clone());
            line
        };

        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(line)
    }

    /// Set the quantity of a line, clamped to `1..=stock`.
    ///
    /// Returns the updated line, or `None` if the product is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn update_qty(
        &self,
        product_id: ProductId,
        qty: u32,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CartItem>::read(self.store, keys::CART).await;
        let Some(line) = snapshot
            .items
            .iter_mut()
            .find(|c| c.product.id == product_id)
        else {
            return Ok(None);
        };
        line.qty = clamp_qty(qty, line.product.stock);
        let line = line.clone();

        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        Ok(Some(line))
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn remove(&self, product_id: ProductId) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<CartItem>::read(self.store, keys::CART).await;
        snapshot.items.retain(|c| c.product.id != product_id);
        snapshot.stage(&mut batch)?;
        commit(batch).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        let mut batch = self.store.batch();
        Self::stage_clear(&mut batch)?;
        commit(batch).await
    }

    /// Stage emptying the cart into `batch`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if serialization fails.
    pub fn stage_clear(batch: &mut Batch<'_>) -> Result<(), RepositoryError> {
        batch.put::<CartItem>(keys::CART, &[])?;
        Ok(())
    }

    /// Sum of unit price times quantity over all lines.
    pub async fn subtotal(&self) -> Price {
        self.items().await.iter().map(CartItem::line_total).sum()
    }
}

/// Clamp a requested quantity into `1..=stock`.
///
/// `stock` of zero yields zero; callers reject out-of-stock products first.
#[must_use]
pub fn clamp_qty(qty: u32, stock: u32) -> u32 {
    qty.max(1).min(stock)
}
