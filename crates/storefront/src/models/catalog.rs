//! Artisan catalog documents served by the REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recraft_core::{CatalogProductId, Price};

/// A product document in the server-side catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: CatalogProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    /// `/uploads/<name>` reference.
    #[serde(default)]
    pub image: Option<String>,
    pub artisan: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
