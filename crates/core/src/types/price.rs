//! Rupee prices using decimal arithmetic.
//!
//! Storefront entries carry their price as a display string (`"₹2,500"`),
//! listings and catalog documents carry a number. [`Price`] is the bridge:
//! it parses both, does the cart arithmetic, and formats back using Indian
//! digit grouping with no fraction digits.
//!
//! Arithmetic saturates at the largest representable amount rather than
//! panicking, so an oversized stored price can never take down a cart total.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Rupee symbol used in display strings.
pub const RUPEE: char = '₹';

/// Errors that can occur when parsing a user-entered price.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Not a number.
    #[error("enter a valid price")]
    NotANumber,
    /// Negative amounts are not sellable.
    #[error("price cannot be negative")]
    Negative,
}

/// An amount in Indian rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from whole rupees.
    #[must_use]
    pub fn from_rupees(rupees: i64) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Parse a user-entered price such as `"2500"` or `"2500.50"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::NotANumber`] for non-numeric input and
    /// [`PriceError::Negative`] for amounts below zero.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s.trim().parse().map_err(|_| PriceError::NotANumber)?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount))
    }

    /// Read a display string such as `"₹2,500"` back into a price.
    ///
    /// Everything except digits and the decimal point is ignored; anything
    /// unparseable reads as zero so a malformed entry never poisons a cart
    /// total.
    #[must_use]
    pub fn from_display_lossy(s: &str) -> Self {
        let digits: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        Self(digits.parse().unwrap_or_default())
    }

    /// Multiply by a line quantity, saturating on overflow.
    #[must_use]
    pub fn times(self, qty: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(qty)))
    }

    /// Percentage of this price, rounded to whole rupees.
    #[must_use]
    pub fn percent(self, pct: u32) -> Self {
        let raw = self.0.saturating_mul(Decimal::from(pct)) / Decimal::ONE_HUNDRED;
        Self(raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Whole rupees (rounded half away from zero), or `None` if the amount is
    /// negative or does not fit in a `u64`.
    #[must_use]
    pub fn to_whole_rupees(self) -> Option<u64> {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
    }

    /// Subtract, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Whether the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Format as `₹1,23,456` (en-IN grouping, whole rupees).
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = rounded.abs().trunc().to_string();
        format!("{sign}{RUPEE}{}", group_indian(&digits))
    }
}

/// Insert en-IN separators: the last three digits, then pairs.
fn group_indian(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    if chars.len() <= 3 {
        return digits.to_owned();
    }
    let (head, tail) = chars.split_at(chars.len() - 3);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    let lead = head.len() % 2;
    for (i, c) in head.iter().enumerate() {
        if i > 0 && (i + 2 - lead) % 2 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out.push(',');
    out.extend(tail);
    out
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_grouping() {
        assert_eq!(Price::from_rupees(0).display(), "₹0");
        assert_eq!(Price::from_rupees(99).display(), "₹99");
        assert_eq!(Price::from_rupees(2_500).display(), "₹2,500");
        assert_eq!(Price::from_rupees(12_345).display(), "₹12,345");
        assert_eq!(Price::from_rupees(123_456).display(), "₹1,23,456");
        assert_eq!(Price::from_rupees(12_345_678).display(), "₹1,23,45,678");
    }

    #[test]
    fn test_display_rounds_to_whole_rupees() {
        assert_eq!(Price::parse("1999.5").unwrap().display(), "₹2,000");
        assert_eq!(Price::parse("1999.49").unwrap().display(), "₹1,999");
    }

    #[test]
    fn test_from_display_lossy() {
        assert_eq!(Price::from_display_lossy("₹2,500"), Price::from_rupees(2_500));
        assert_eq!(Price::from_display_lossy("₹1,23,456"), Price::from_rupees(123_456));
        assert_eq!(Price::from_display_lossy("free"), Price::ZERO);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("-5"), Err(PriceError::Negative));
        assert_eq!(Price::parse(" 0 ").unwrap(), Price::ZERO);
    }

    #[test]
    fn test_arithmetic() {
        let unit = Price::from_rupees(1_200);
        assert_eq!(unit.times(3), Price::from_rupees(3_600));
        assert_eq!(Price::from_rupees(2_345).percent(10), Price::from_rupees(235));
        assert_eq!(
            Price::from_rupees(50).saturating_sub(Price::from_rupees(80)),
            Price::ZERO
        );
        let total: Price = [unit, unit].into_iter().sum();
        assert_eq!(total, Price::from_rupees(2_400));
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_overflowing() {
        let huge = Price::new(Decimal::MAX);
        assert_eq!(huge.times(2), huge);
        assert_eq!(huge + Price::from_rupees(1), huge);
        let total: Price = [huge, huge, Price::from_rupees(10)].into_iter().sum();
        assert_eq!(total, huge);
        assert_eq!(huge.percent(10).to_whole_rupees(), None);
    }

    #[test]
    fn test_to_whole_rupees() {
        assert_eq!(Price::parse("2499.5").unwrap().to_whole_rupees(), Some(2_500));
        assert_eq!(Price::ZERO.to_whole_rupees(), Some(0));
        assert_eq!(Price::new(Decimal::MAX).to_whole_rupees(), None);
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&Price::from_rupees(450)).unwrap();
        assert_eq!(json, "450.0");
        let back: Price = serde_json::from_str("450").unwrap();
        assert_eq!(back, Price::from_rupees(450));
    }
}
