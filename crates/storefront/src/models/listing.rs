//! Seller listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recraft_core::ListingId;

/// A row in the seller's "My Listings" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    /// Whole rupees.
    pub price: u64,
    pub stock: u32,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    /// Case-insensitive match on title or id.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.id.as_str().to_lowercase().contains(&query)
    }
}
