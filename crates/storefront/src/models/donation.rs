//! Waste donation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recraft_core::{Condition, DonationId};

/// A recorded donation of waste material.
///
/// Field names follow the multipart form the REST API accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    #[serde(default)]
    pub donor_name: Option<String>,
    pub material_type: String,
    /// Free-text amount, e.g. `"3 kg"`.
    pub quantity: String,
    #[serde(default)]
    pub condition: Option<Condition>,
    /// `/uploads/<name>` references.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub pickup: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    pub consent: bool,
    /// Serviceability of `pincode` at submission time, when pickup was asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_serviceable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
