//! Indian postal codes and the pickup serviceability rule.
//!
//! A pincode is six digits with a non-zero first digit. Pickup is offered
//! when the leading digit falls in [`SERVICEABLE_PREFIXES`]. The same
//! response shape is produced whether the answer comes from this rule or from
//! a remote lookup service.

use core::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Leading digits for which pickup logistics are currently offered.
pub const SERVICEABLE_PREFIXES: &[char] = &['5', '6', '7', '8'];

/// Message returned for malformed input.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid pincode format.";

const SERVICEABLE_REGION: &str = "Serviceable Region";
const OUTSIDE_REGION: &str = "Outside service area";
const SERVICEABLE_MESSAGE: &str = "Pickup available in this area.";
const NOT_SERVICEABLE_MESSAGE: &str = "Sorry, pickup is not available in this pincode.";

static PINCODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("pincode pattern is valid"));

/// Errors that can occur when parsing a [`Pincode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PincodeError {
    /// The input is not six digits with a non-zero lead.
    #[error("enter a valid 6-digit pincode")]
    InvalidFormat,
}

/// A syntactically valid 6-digit pincode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pincode(String);

impl Pincode {
    /// Parse a pincode, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`PincodeError::InvalidFormat`] unless the trimmed input
    /// matches `^[1-9][0-9]{5}$`.
    pub fn parse(s: &str) -> Result<Self, PincodeError> {
        let s = s.trim();
        if PINCODE_PATTERN.is_match(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(PincodeError::InvalidFormat)
        }
    }

    /// Returns the pincode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first digit, which selects the postal zone.
    #[must_use]
    pub fn zone(&self) -> char {
        self.0.chars().next().unwrap_or('0')
    }

    /// Whether pickup is offered for this pincode's zone.
    #[must_use]
    pub fn is_serviceable(&self) -> bool {
        SERVICEABLE_PREFIXES.contains(&self.zone())
    }
}

impl fmt::Display for Pincode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pincode {
    type Error = PincodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pincode> for String {
    fn from(code: Pincode) -> Self {
        code.0
    }
}

/// Result of a serviceability check.
///
/// This is also the JSON body of `GET /api/check-pincode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Serviceability {
    /// Whether pickup is offered.
    pub serviceable: bool,
    /// The code as submitted (trimmed).
    pub code: String,
    /// Region label; absent for format rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Human-readable explanation.
    pub message: String,
}

impl Serviceability {
    /// Rejection for input that is not a pincode at all.
    #[must_use]
    pub fn invalid_format(code: &str) -> Self {
        Self {
            serviceable: false,
            code: code.trim().to_owned(),
            region: None,
            message: INVALID_FORMAT_MESSAGE.to_owned(),
        }
    }

    /// Whether this result is a format rejection rather than a classification.
    #[must_use]
    pub fn is_format_rejection(&self) -> bool {
        !self.serviceable && self.region.is_none() && self.message == INVALID_FORMAT_MESSAGE
    }
}

/// Apply the local prefix rule to raw input.
///
/// Malformed input is rejected without classification.
#[must_use]
pub fn classify(raw: &str) -> Serviceability {
    let Ok(code) = Pincode::parse(raw) else {
        return Serviceability::invalid_format(raw);
    };

    let serviceable = code.is_serviceable();
    let (region, message) = if serviceable {
        (SERVICEABLE_REGION, SERVICEABLE_MESSAGE)
    } else {
        (OUTSIDE_REGION, NOT_SERVICEABLE_MESSAGE)
    };

    Serviceability {
        serviceable,
        code: code.into(),
        region: Some(region.to_owned()),
        message: message.to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Pincode::parse(" 560001 ").unwrap().as_str(), "560001");
        assert_eq!(Pincode::parse("110001").unwrap().zone(), '1');
    }

    #[test]
    fn test_parse_invalid() {
        for bad in ["", "056001", "56001", "5600011", "56OO01", "560 01", "+56001"] {
            assert_eq!(Pincode::parse(bad), Err(PincodeError::InvalidFormat), "{bad}");
        }
    }

    #[test]
    fn test_every_zone_follows_allow_list() {
        for zone in '1'..='9' {
            let result = classify(&format!("{zone}00001"));
            assert_eq!(
                result.serviceable,
                SERVICEABLE_PREFIXES.contains(&zone),
                "zone {zone}"
            );
            assert!(result.region.is_some());
            assert!(!result.is_format_rejection());
        }
    }

    #[test]
    fn test_bengaluru_is_serviceable() {
        let result = classify("560001");
        assert!(result.serviceable);
        assert_eq!(result.code, "560001");
        assert_eq!(result.region.as_deref(), Some("Serviceable Region"));
        assert_eq!(result.message, "Pickup available in this area.");
    }

    #[test]
    fn test_delhi_is_not_serviceable() {
        let result = classify("110001");
        assert!(!result.serviceable);
        assert_eq!(result.region.as_deref(), Some("Outside service area"));
    }

    #[test]
    fn test_malformed_is_rejected_without_region() {
        let result = classify("12ab");
        assert!(result.is_format_rejection());
        assert_eq!(result.message, "Invalid pincode format.");
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("region").is_none());
    }
}
