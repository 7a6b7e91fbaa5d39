//! Cart totals and order placement.

use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use recraft_core::{OrderId, OrderStatus, PaymentMethod, Price};

use super::validation::ValidationErrors;
use crate::db::{CartRepository, OrderRepository, RepositoryError};
use crate::kv::{JsonStore, StoreError, keys};
use crate::models::{CartItem, Order, OrderItem, ShippingAddress};

/// Orders at or above this amount (after discount) ship free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 3_000;

/// Shipping charged below the threshold.
pub const FLAT_SHIPPING: i64 = 99;

/// Country every order ships to.
const SHIPPING_COUNTRY: &str = "India";

/// Errors from checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid checkout: {0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

impl From<ValidationErrors> for CheckoutError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Discount codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coupon {
    /// 10% off the subtotal, rounded to whole rupees.
    Green10,
    /// No shipping charge.
    FreeShip,
}

impl Coupon {
    /// The canonical upper-case code recorded on orders.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Green10 => "GREEN10",
            Self::FreeShip => "FREESHIP",
        }
    }
}

impl FromStr for Coupon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREEN10" => Ok(Self::Green10),
            "FREESHIP" => Ok(Self::FreeShip),
            _ => Err(format!("unknown coupon: {s}")),
        }
    }
}

/// Money breakdown of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: Price,
    pub discount: Price,
    pub shipping: Price,
    pub total: Price,
}

impl CartTotals {
    /// Totals for `items` with an optional coupon applied.
    #[must_use]
    pub fn compute(items: &[CartItem], coupon: Option<Coupon>) -> Self {
        let subtotal: Price = items.iter().map(CartItem::line_total).sum();
        let discount = match coupon {
            Some(Coupon::Green10) => subtotal.percent(10),
            _ => Price::ZERO,
        };
        let discounted = subtotal.saturating_sub(discount);
        let ships_free = subtotal.is_zero()
            || discounted >= Price::from_rupees(FREE_SHIPPING_THRESHOLD)
            || coupon == Some(Coupon::FreeShip);
        let shipping = if ships_free {
            Price::ZERO
        } else {
            Price::from_rupees(FLAT_SHIPPING)
        };
        Self {
            subtotal,
            discount,
            shipping,
            total: discounted + shipping,
        }
    }
}

/// Shipping and payment details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutForm {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub notes: String,
    pub payment_method: PaymentMethod,
    pub coupon: Option<String>,
}

impl CheckoutForm {
    fn validate(&self) -> Result<Option<Coupon>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value, label) in [
            ("fullName", &self.full_name, "Full name"),
            ("phone", &self.phone, "Phone"),
            ("address1", &self.address1, "Address"),
            ("city", &self.city, "City"),
            ("state", &self.state, "State"),
            ("pincode", &self.pincode, "Pincode"),
        ] {
            errors.check(
                value.trim().is_empty(),
                field,
                &format!("{label} is required"),
            );
        }

        let coupon = match self.coupon.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => {
                let parsed = code.parse::<Coupon>().ok();
                errors.check(parsed.is_none(), "coupon", "Invalid coupon");
                parsed
            }
        };

        errors.into_result()?;
        Ok(coupon)
    }

    fn shipping_address(&self) -> ShippingAddress {
        let line2 = self.address2.trim();
        let address = if line2.is_empty() {
            self.address1.trim().to_owned()
        } else {
            format!("{}, {line2}", self.address1.trim())
        };
        ShippingAddress {
            name: self.full_name.trim().to_owned(),
            address,
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            pincode: self.pincode.trim().to_owned(),
            country: SHIPPING_COUNTRY.to_owned(),
            phone: Some(self.phone.trim().to_owned()),
        }
    }
}

/// Turns the cart into an order.
pub struct CheckoutService<'a> {
    store: &'a JsonStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service over `store`.
    #[must_use]
    pub const fn new(store: &'a JsonStore) -> Self {
        Self { store }
    }

    /// Current cart totals.
    pub async fn totals(&self, coupon: Option<Coupon>) -> CartTotals {
        CartTotals::compute(&CartRepository::new(self.store).items().await, coupon)
    }

    /// Place an order for the whole cart.
    ///
    /// The order is recorded and the cart emptied in one batch. If the cart
    /// changes between reading it and committing, the commit fails with a
    /// stale write instead of ordering the wrong items.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Validation` for an empty cart, missing
    /// shipping fields or an unknown coupon. Returns
    /// `CheckoutError::Repository` if the write fails.
    #[tracing::instrument(skip(self, form), fields(payment = ?form.payment_method))]
    pub async fn place_order(&self, form: &CheckoutForm) -> Result<Order, CheckoutError> {
        let mut batch = self.store.write().await;
        let cart_revision = self.store.revision(keys::CART).await;
        let items = CartRepository::new(self.store).items().await;
        if items.is_empty() {
            return Err(ValidationErrors::single("cart", "Your cart is empty").into());
        }
        let coupon = form.validate()?;
        let totals = CartTotals::compute(&items, coupon);

        let order = Order {
            id: OrderId::generate(),
            created_at: Utc::now(),
            status: OrderStatus::Pending,
            items: items
                .iter()
                .map(|line| OrderItem {
                    id: line.product.id,
                    title: line.product.name.clone(),
                    qty: line.qty,
                    price: line.product.unit_price(),
                    image: (!line.product.image.is_empty()).then(|| line.product.image.clone()),
                })
                .collect(),
            shipping_to: form.shipping_address(),
            payment_method: form.payment_method,
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping: totals.shipping,
            total: totals.total,
            coupon: coupon.map(|c| c.code().to_owned()),
        };

        OrderRepository::new(self.store)
            .stage_insert(&mut batch, order.clone())
            .await?;
        batch.expect_revision(keys::CART, cart_revision);
        CartRepository::stage_clear(&mut batch)?;
        batch.commit().await?;

        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use recraft_core::ProductId;

    use super::*;
    use crate::models::product::seed_catalog;

    fn line(rupees: &str, qty: u32) -> CartItem {
        let mut product = seed_catalog().remove(0);
        product.price = rupees.to_owned();
        CartItem { product, qty }
    }

    fn form() -> CheckoutForm {
        CheckoutForm {
            full_name: "Asha Rao".to_owned(),
            phone: "98765 43210".to_owned(),
            address1: "12 MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            pincode: "560001".to_owned(),
            ..CheckoutForm::default()
        }
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let totals = CartTotals::compute(&[line("₹1,000", 2)], None);
        assert_eq!(totals.subtotal, Price::from_rupees(2_000));
        assert_eq!(totals.shipping, Price::from_rupees(99));
        assert_eq!(totals.total, Price::from_rupees(2_099));
    }

    #[test]
    fn test_free_shipping_at_threshold_and_for_empty_cart() {
        let totals = CartTotals::compute(&[line("₹3,000", 1)], None);
        assert!(totals.shipping.is_zero());
        assert!(CartTotals::compute(&[], None).shipping.is_zero());
    }

    #[test]
    fn test_discount_counts_against_threshold() {
        // 3,200 less 10% is 2,880, below the threshold.
        let totals = CartTotals::compute(&[line("₹3,200", 1)], Some(Coupon::Green10));
        assert_eq!(totals.discount, Price::from_rupees(320));
        assert_eq!(totals.shipping, Price::from_rupees(99));
        assert_eq!(totals.total, Price::from_rupees(2_979));
    }

    #[test]
    fn test_green10_rounds_and_freeship_waives() {
        let totals = CartTotals::compute(&[line("₹1,005", 1)], Some(Coupon::Green10));
        assert_eq!(totals.discount, Price::from_rupees(101));

        let totals = CartTotals::compute(&[line("₹500", 1)], Some(Coupon::FreeShip));
        assert!(totals.shipping.is_zero());
        assert_eq!(totals.total, Price::from_rupees(500));
    }

    #[test]
    fn test_coupon_codes_are_case_insensitive() {
        assert_eq!(" green10 ".parse::<Coupon>().unwrap(), Coupon::Green10);
        assert_eq!("FreeShip".parse::<Coupon>().unwrap(), Coupon::FreeShip);
        assert!("SAVE50".parse::<Coupon>().is_err());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let store = JsonStore::memory();
        let err = CheckoutService::new(&store)
            .place_order(&form())
            .await
            .unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("cart"));
    }

    #[tokio::test]
    async fn test_missing_shipping_fields_are_rejected() {
        let store = JsonStore::memory();
        let cart = CartRepository::new(&store);
        cart.add(seed_catalog().remove(0), 1).await.unwrap();

        let mut incomplete = form();
        incomplete.city.clear();
        incomplete.phone = "   ".to_owned();
        let CheckoutError::Validation(errors) = CheckoutService::new(&store)
            .place_order(&incomplete)
            .await
            .unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert!(errors.contains("city"));
        assert!(errors.contains("phone"));
        assert_eq!(cart.items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_place_order_records_order_and_clears_cart() {
        let store = JsonStore::memory();
        let cart = CartRepository::new(&store);
        cart.add(seed_catalog().remove(1), 2).await.unwrap();

        let mut with_coupon = form();
        with_coupon.coupon = Some("freeship".to_owned());
        let order = CheckoutService::new(&store)
            .place_order(&with_coupon)
            .await
            .unwrap();

        assert!(order.id.as_str().starts_with("RC-"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].id, ProductId::new(2));
        assert_eq!(order.items[0].qty, 2);
        assert!(order.shipping.is_zero());
        assert_eq!(order.coupon.as_deref(), Some("FREESHIP"));
        assert_eq!(order.shipping_to.country, "India");

        assert!(cart.items().await.is_empty());
        let orders = OrderRepository::new(&store).all().await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order.id);
    }
}
