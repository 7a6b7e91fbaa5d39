//! Fixed storage keys.
//!
//! Every collection lives under exactly one key. Keys double as file names in
//! the file-backed store, so they are limited to `[a-z0-9_]`.

/// Registered users.
pub const USERS: &str = "rc_users";
/// The signed-in user (single object).
pub const CURRENT_USER: &str = "rc_user";
/// Authentication flag (single object).
pub const AUTH: &str = "rc_auth";
/// Cart entries.
pub const CART: &str = "rc_cart";
/// Wishlist entries.
pub const WISHLIST: &str = "rc_wishlist";
/// Seller listings.
pub const LISTINGS: &str = "rc_listings";
/// Storefront products created from listings.
pub const USER_PRODUCTS: &str = "rc_user_products";
/// Placed orders.
pub const ORDERS: &str = "rc_orders";
/// Most recent donation submitted from this data directory (single object).
pub const LAST_DONATION: &str = "last_waste_donation";
/// All donation records.
pub const DONATIONS: &str = "donations";
/// Artisan catalog documents served by the REST API.
pub const CATALOG: &str = "products";

/// Whether `key` is usable as a storage key.
#[must_use]
pub fn is_valid(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}
