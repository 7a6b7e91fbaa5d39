//! Order repository.

use std::sync::LazyLock;

use regex::Regex;

use recraft_core::{OrderId, OrderStatus};

use super::{RepositoryError, Snapshot, commit};
use crate::kv::{Batch, JsonStore, keys};
use crate::models::Order;

/// Ids of the placeholder orders early builds seeded (`RC-1001` ...).
static DEMO_ORDER_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^RC-100\d$").ok());

/// Repository for placed orders. Newest orders come first.
pub struct OrderRepository<'a> {
    store: &'a JsonStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// All orders, newest first.
    pub async fn all(&self) -> Vec<Order> {
        self.store.load(keys::ORDERS).await
    }

    /// Get an order by id.
    pub async fn get(&self, id: &OrderId) -> Option<Order> {
        self.all().await.into_iter().find(|o| &o.id == id)
    }

    /// Orders matching `query` (id or item title) and, if given, `status`.
    pub async fn search(&self, query: &str, status: Option<OrderStatus>) -> Vec<Order> {
        self.all()
            .await
            .into_iter()
            .filter(|o| status.is_none_or(|s| o.status == s) && o.matches(query))
            .collect()
    }

    /// Record a new order at the front.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let mut batch = self.store.write().await;
        self.stage_insert(&mut batch, order).await?;
        commit(batch).await
    }

    /// Stage a new order into `batch`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id is already taken.
    pub async fn stage_insert(
        &self,
        batch: &mut Batch<'_>,
        order: Order,
    ) -> Result<(), RepositoryError> {
        let mut snapshot = Snapshot::<Order>::read(self.store, keys::ORDERS).await;
        if snapshot.items.iter().any(|o| o.id == order.id) {
            return Err(RepositoryError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        snapshot.items.insert(0, order);
        snapshot.stage(batch)
    }

    /// Drop the stored orders if every one of them is a legacy demo order.
    ///
    /// Returns how many orders were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the write fails.
    pub async fn purge_demo(&self) -> Result<usize, RepositoryError> {
        let Some(pattern) = DEMO_ORDER_ID.as_ref() else {
            return Ok(0);
        };
        let mut batch = self.store.write().await;
        let mut snapshot = Snapshot::<Order>::read(self.store, keys::ORDERS).await;
        if snapshot.items.is_empty()
            || !snapshot
                .items
                .iter()
                .all(|o| pattern.is_match(o.id.as_str()))
        {
            return Ok(0);
        }

        let removed = snapshot.items.len();
        snapshot.items.clear();
        snapshot.stage(&mut batch)?;
        commit(batch).await?;
        tracing::info!(removed, "purged demo orders");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::Utc;
    use recraft_core::{PaymentMethod, Price, ProductId};

    use super::*;
    use crate::models::{OrderItem, ShippingAddress};

    fn order(id: &str, title: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(id),
            created_at: Utc::now(),
            status,
            items: vec![OrderItem {
                id: ProductId::new(1),
                title: title.to_owned(),
                qty: 1,
                price: Price::from_rupees(100),
                image: None,
            }],
            shipping_to: ShippingAddress {
                name: "Asha".to_owned(),
                address: "12 MG Road".to_owned(),
                city: "Bengaluru".to_owned(),
                state: "Karnataka".to_owned(),
                pincode: "560001".to_owned(),
                country: "India".to_owned(),
                phone: None,
            },
            payment_method: PaymentMethod::Cod,
            subtotal: Price::from_rupees(100),
            discount: Price::ZERO,
            shipping: Price::from_rupees(99),
            total: Price::from_rupees(199),
            coupon: None,
        }
    }

    #[tokio::test]
    async fn test_insert_prepends_and_search_filters() {
        let store = JsonStore::memory();
        let repo = OrderRepository::new(&store);
        repo.insert(order("RC-A", "Jute Bag", OrderStatus::Pending))
            .await
            .unwrap();
        repo.insert(order("RC-B", "Coco Bowl", OrderStatus::Shipped))
            .await
            .unwrap();

        assert_eq!(repo.all().await[0].id.as_str(), "RC-B");
        assert_eq!(repo.search("bowl", None).await.len(), 1);
        assert_eq!(repo.search("", Some(OrderStatus::Pending)).await[0].id.as_str(), "RC-A");
        assert!(repo.search("rc-a", Some(OrderStatus::Shipped)).await.is_empty());
        assert!(repo.get(&OrderId::new("RC-B")).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_demo_only_when_all_are_demo() {
        let store = JsonStore::memory();
        let repo = OrderRepository::new(&store);
        repo.insert(order("RC-1001", "Demo", OrderStatus::Delivered))
            .await
            .unwrap();
        repo.insert(order("RC-REAL1", "Real", OrderStatus::Pending))
            .await
            .unwrap();
        assert_eq!(repo.purge_demo().await.unwrap(), 0);
        assert_eq!(repo.all().await.len(), 2);

        store
            .save(
                keys::ORDERS,
                &[
                    order("RC-1001", "Demo", OrderStatus::Delivered),
                    order("RC-1002", "Demo", OrderStatus::Cancelled),
                ],
            )
            .await
            .unwrap();
        assert_eq!(repo.purge_demo().await.unwrap(), 2);
        assert!(repo.all().await.is_empty());
    }
}
