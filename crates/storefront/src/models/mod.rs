//! Domain models for the marketplace.
//!
//! These are the documents persisted by [`crate::kv::JsonStore`]; field names
//! follow the JSON shapes the storefront and the REST API exchange.

pub mod cart;
pub mod catalog;
pub mod donation;
pub mod listing;
pub mod order;
pub mod product;
pub mod user;

pub use cart::CartItem;
pub use catalog::CatalogProduct;
pub use donation::Donation;
pub use listing::Listing;
pub use order::{Order, OrderItem, ShippingAddress};
pub use product::Product;
pub use user::{PublicUser, User};
