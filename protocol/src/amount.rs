//! # Exact Decimal Amounts
//!
//! Deposits and locked balances are arbitrary decimals, not integer
//! smallest-units: the platform quotes cautions like `"12.5"` and expects
//! them back exactly. [`Amount`] wraps a [`rust_decimal::Decimal`] and
//! always crosses the wire as a decimal *string*, so there is no binary
//! floating point between the caller and the ledger.
//!
//! Parsing is exact: input that cannot be represented without rounding is
//! rejected instead of silently truncated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input is not a decimal number, or would lose precision.
    #[error("invalid amount '{input}': {reason}")]
    Parse {
        /// The rejected input.
        input: String,
        /// Why the decimal parser refused it.
        reason: String,
    },
}

/// An exact, signed decimal amount.
///
/// Signed, so a negative amount reaches the ledger and can be rejected
/// with a typed error. Comparison is numeric, so
/// `"1.0"` and `"1.00"` are equal even though they print differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Wrap a decimal value. Negative zero is folded into zero.
    pub fn new(value: Decimal) -> Self {
        let mut value = value;
        if value.is_zero() {
            value.set_sign_positive(true);
        }
        Self(value)
    }

    /// The underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// `true` if the amount is strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// `true` if the amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition. `None` on overflow or when the exact sum does not
    /// fit a decimal and would have to be rounded.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        let sum = self.0.checked_add(other.0)?;
        exact(sum, self.0, other.0, sum.checked_sub(other.0)?)
    }

    /// Checked subtraction. `None` on overflow or rounding; a negative
    /// result is returned as-is, callers decide whether that is acceptable.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        let diff = self.0.checked_sub(other.0)?;
        exact(diff, self.0, other.0, diff.checked_add(other.0)?)
    }
}

/// Accepts `result` only if `Decimal` kept every digit of its operands.
/// A rounded result drops scale, and undoing the operation no longer
/// gives back `lhs`.
fn exact(result: Decimal, lhs: Decimal, rhs: Decimal, undone: Decimal) -> Option<Amount> {
    if result.scale() < lhs.scale().max(rhs.scale()) || undone != lhs {
        return None;
    }
    Some(Amount::new(result))
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str_exact(s)
            .map(Amount::new)
            .map_err(|e| AmountError::Parse {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn parse_keeps_scale() {
        assert_eq!(amt("12.50").to_string(), "12.50");
        assert_eq!(amt("100").to_string(), "100");
    }

    #[test]
    fn numeric_equality_ignores_scale() {
        assert_eq!(amt("1.0"), amt("1.00"));
        assert!(amt("0.1") < amt("0.10001"));
    }

    #[test]
    fn rejects_garbage() {
        assert!("twelve".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
        assert!("1e3x".parse::<Amount>().is_err());
    }

    #[test]
    fn rejects_input_that_would_round() {
        // 30 significant digits do not fit a 96-bit mantissa.
        let err = "0.123456789012345678901234567890".parse::<Amount>();
        assert!(err.is_err());
    }

    #[test]
    fn negative_detection_and_negative_zero() {
        assert!(amt("-5").is_negative());
        assert!(!amt("0").is_negative());
        let neg_zero = amt("-0");
        assert!(!neg_zero.is_negative());
        assert_eq!(neg_zero, Amount::ZERO);
        assert_eq!(neg_zero.to_string(), "0");
    }

    #[test]
    fn repeated_add_sub_is_exact() {
        // 0.1 + 0.2 would drift in f64; here it must not.
        let mut balance = Amount::ZERO;
        for _ in 0..1_000 {
            balance = balance.checked_add(amt("0.1")).unwrap();
            balance = balance.checked_add(amt("0.2")).unwrap();
        }
        assert_eq!(balance, amt("300"));
        for _ in 0..1_000 {
            balance = balance.checked_sub(amt("0.3")).unwrap();
        }
        assert!(balance.is_zero());
    }

    #[test]
    fn sum_needing_more_digits_is_refused() {
        // 11.0000000000000000000000000001 needs 30 digits; Decimal holds 28-29.
        let fine = amt("1.0000000000000000000000000001");
        assert_eq!(amt("10").checked_add(fine), None);
        assert_eq!(fine.checked_add(amt("10")), None);
        assert_eq!(amt("-10").checked_sub(fine), None);
        assert_eq!(fine.checked_add(fine), Some(amt("2.0000000000000000000000000002")));
    }

    #[test]
    fn overflow_is_refused() {
        assert_eq!(Amount::new(Decimal::MAX).checked_add(amt("1")), None);
        assert_eq!(Amount::new(Decimal::MIN).checked_sub(amt("1")), None);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&amt("42.001")).unwrap();
        assert_eq!(json, "\"42.001\"");
        let back: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), "42.001");
    }

    #[test]
    fn deserialize_rejects_json_number() {
        assert!(serde_json::from_str::<Amount>("42.5").is_err());
    }
}
