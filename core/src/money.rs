//! Money in integer cents.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Largest cent count an `f64` holds exactly (2^53).
const MAX_EXACT_CENTS: f64 = 9_007_199_254_740_992.0;

/// Monetary amount stored as whole cents.
///
/// Arithmetic is checked; totals never go through floating point. On the wire the
/// amount is a decimal number of dollars (`25.5`), with at most two fraction digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(u64);

impl Money {
    /// Zero
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(u64::from(quantity)).map(Self)
    }

    /// Parses a dollar amount, rejecting sub-cent precision.
    fn from_dollars(dollars: f64) -> Option<Self> {
        if !dollars.is_finite() || dollars < 0.0 {
            return None;
        }
        let scaled = dollars * 100.0;
        let cents = scaled.round();
        if (scaled - cents).abs() > 1e-6 || cents > MAX_EXACT_CENTS {
            return None;
        }
        // Non-negative and below 2^53
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cents = cents as u64;
        Some(Self(cents))
    }

    /// Converts to the signed representation used by `BIGINT` columns.
    #[must_use]
    pub fn to_db(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    /// Converts from a `BIGINT` column, rejecting negative values.
    #[must_use]
    pub fn from_db(cents: i64) -> Option<Self> {
        u64::try_from(cents).ok().map(Self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % 100 == 0 {
            return serializer.serialize_u64(self.0 / 100);
        }
        #[allow(clippy::cast_precision_loss)]
        let dollars = self.0 as f64 / 100.0;
        serializer.serialize_f64(dollars)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DollarsVisitor)
    }
}

struct DollarsVisitor;

impl Visitor<'_> for DollarsVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative dollar amount with at most two decimal places")
    }

    fn visit_u64<E: de::Error>(self, dollars: u64) -> Result<Money, E> {
        dollars
            .checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom(format!("amount out of range: {dollars}")))
    }

    fn visit_i64<E: de::Error>(self, dollars: i64) -> Result<Money, E> {
        let dollars = u64::try_from(dollars)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(dollars), &self))?;
        self.visit_u64(dollars)
    }

    fn visit_f64<E: de::Error>(self, dollars: f64) -> Result<Money, E> {
        Money::from_dollars(dollars)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Float(dollars), &self))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_dollars() {
        assert_eq!(Money::from_cents(2_550).to_string(), "$25.50");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
    }

    #[test]
    fn checked_arithmetic() {
        let line = Money::from_cents(1_000).checked_mul(2);
        assert_eq!(line, Some(Money::from_cents(2_000)));
        assert_eq!(Money::from_cents(u64::MAX).checked_mul(2), None);
        assert_eq!(Money::from_cents(u64::MAX).checked_add(Money::from_cents(1)), None);
    }

    #[test]
    fn db_conversion_rejects_negative() {
        assert_eq!(Money::from_db(-1), None);
        assert_eq!(Money::from_db(550), Some(Money::from_cents(550)));
        assert_eq!(Money::from_cents(u64::MAX).to_db(), None);
    }

    #[test]
    fn serializes_as_dollars() {
        assert_eq!(serde_json::to_value(Money::from_cents(2_550)).unwrap(), serde_json::json!(25.5));
        assert_eq!(serde_json::to_value(Money::from_cents(1_000)).unwrap(), serde_json::json!(10));
        assert_eq!(serde_json::to_value(Money::from_cents(7)).unwrap(), serde_json::json!(0.07));
    }

    #[test]
    fn deserializes_integer_and_decimal_dollars() {
        let parse = |v: serde_json::Value| serde_json::from_value::<Money>(v).unwrap();
        assert_eq!(parse(serde_json::json!(10)), Money::from_cents(1_000));
        assert_eq!(parse(serde_json::json!(10.0)), Money::from_cents(1_000));
        assert_eq!(parse(serde_json::json!(5.5)), Money::from_cents(550));
        assert_eq!(parse(serde_json::json!(19.99)), Money::from_cents(1_999));
        assert_eq!(parse(serde_json::json!(0.07)), Money::from_cents(7));
    }

    #[test]
    fn rejects_sub_cent_and_negative_amounts() {
        for bad in [
            serde_json::json!(10.005),
            serde_json::json!(-1),
            serde_json::json!(-0.5),
            serde_json::json!("10.00"),
        ] {
            assert!(serde_json::from_value::<Money>(bad.clone()).is_err(), "{bad}");
        }
    }

    #[test]
    fn survives_a_json_round_trip() {
        let amount = Money::from_cents(123_456_789);
        let text = serde_json::to_string(&amount).unwrap();
        assert_eq!(text, "1234567.89");
        assert_eq!(serde_json::from_str::<Money>(&text).unwrap(), amount);
    }
}
