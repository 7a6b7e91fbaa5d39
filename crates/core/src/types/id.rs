//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! # Generated identifiers
//!
//! Identifiers are built from the wall clock and a short random suffix. They
//! are neither cryptographically random nor strictly monotonic: two ids minted
//! in the same millisecond by different processes can collide. That is good
//! enough for a single local data directory, and the donation store re-rolls
//! on collision.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>`, `AsRef<str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use recraft_core::define_id;
/// define_id!(ShopId);
/// define_id!(ReviewId);
///
/// let shop = ShopId::new("s-1");
/// let review = ReviewId::new("s-1");
///
/// // These are different types, so this won't compile:
/// // let _: ShopId = review;
/// assert_eq!(shop.as_str(), review.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ListingId);
define_id!(DonationId);
define_id!(OrderId);
define_id!(CatalogProductId);

/// Length of the random base-36 suffix on generated ids.
const SUFFIX_LEN: usize = 6;

/// Prefix carried by every donation reference shown to donors.
pub const DONATION_ID_PREFIX: &str = "DON-";

/// Prefix carried by order numbers.
pub const ORDER_ID_PREFIX: &str = "RC-";

impl UserId {
    /// Mint a new `{unix_millis}-{suffix}` user id.
    #[must_use]
    pub fn generate() -> Self {
        Self(timestamped())
    }
}

impl ListingId {
    /// Mint a new `{unix_millis}-{suffix}` listing id.
    #[must_use]
    pub fn generate() -> Self {
        Self(timestamped())
    }
}

impl DonationId {
    /// Mint a human-readable donation reference such as `DON-4K2ZQ8`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{DONATION_ID_PREFIX}{}",
            random_base36(SUFFIX_LEN).to_uppercase()
        ))
    }
}

impl OrderId {
    /// Mint an order number from the current time, e.g. `RC-M3X9K2QA`.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!(
            "{ORDER_ID_PREFIX}{}",
            to_base36(unix_millis()).to_uppercase()
        ))
    }
}

impl CatalogProductId {
    /// Mint a random document id for a catalog product.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// Numeric storefront product identifier.
///
/// The seeded demo catalog occupies the low numbers; user-submitted products
/// take the next free number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    /// Create a new product ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

fn unix_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}

fn timestamped() -> String {
    format!("{}-{}", unix_millis(), random_base36(SUFFIX_LEN))
}

/// Random lower-case base-36 string of `len` characters.
#[must_use]
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| char::from_digit(rng.random_range(0..36), 36))
        .collect()
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while n > 0 {
        let digit = u32::try_from(n % 36).unwrap_or_default();
        if let Some(c) = char::from_digit(digit, 36) {
            digits.push(c);
        }
        n /= 36;
    }
    digits.iter().rev().collect()
}
