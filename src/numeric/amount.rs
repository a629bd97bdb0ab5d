// ============================================================================
// Amount
// Strictly positive decimal quantity used for both sides of an order
// ============================================================================

use super::errors::{NumericError, NumericResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A decimal quantity that is always `> 0`.
///
/// Construction is the only place positivity is checked; every arithmetic
/// helper returns a `NumericResult` so a non-positive result can never escape
/// as an `Amount`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> NumericResult<Self> {
        if value <= Decimal::ZERO {
            return Err(NumericError::NonPositive);
        }
        Ok(Self(value.normalize()))
    }

    pub fn from_integer(value: i64) -> NumericResult<Self> {
        Self::new(Decimal::from(value))
    }

    /// Parse a JSON number exactly as it was written on the wire.
    ///
    /// Integers and plain decimals go through `Decimal::from_str`; exponent
    /// notation (`1e-7`) goes through `from_scientific`.
    pub fn from_json_number(number: &serde_json::Number) -> NumericResult<Self> {
        let text = number.to_string();
        let value = Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|_| NumericError::InvalidInput)?;
        Self::new(value)
    }

    #[inline]
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn checked_sub(self, rhs: Decimal) -> NumericResult<Self> {
        let value = self.0.checked_sub(rhs).ok_or(NumericError::Overflow)?;
        Self::new(value)
    }

    /// `self * numerator / denominator`, multiplying first to keep precision.
    pub fn scaled(self, numerator: Amount, denominator: Amount) -> NumericResult<Decimal> {
        let product = self
            .0
            .checked_mul(numerator.0)
            .ok_or(NumericError::Overflow)?;
        product
            .checked_div(denominator.0)
            .ok_or(NumericError::DivisionByZero)
    }
}

/// `buy / sell`. Both sides are positive so only overflow can fail.
pub fn exchange_rate(buy: Amount, sell: Amount) -> NumericResult<Decimal> {
    buy.0.checked_div(sell.0).ok_or(NumericError::Overflow)
}

/// Exact `a_num / a_den <= b_num / b_den` for positive operands.
///
/// Cross-multiplies so that rates like 1/3 compare without rounding. Falls
/// back to comparing the quotients if a product leaves the decimal range.
pub fn rate_not_above(a_num: Amount, a_den: Amount, b_num: Amount, b_den: Amount) -> bool {
    match (a_num.0.checked_mul(b_den.0), b_num.0.checked_mul(a_den.0)) {
        (Some(lhs), Some(rhs)) => lhs <= rhs,
        _ => match (exchange_rate(a_num, a_den), exchange_rate(b_num, b_den)) {
            (Ok(a), Ok(b)) => a.cmp(&b) != Ordering::Greater,
            _ => false,
        },
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Amount {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| NumericError::InvalidInput)?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl PartialEq<Decimal> for Amount {
    fn eq(&self, other: &Decimal) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<Decimal> for Amount {
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        self.0.partial_cmp(other)
    }
}

// Amounts travel as JSON numbers on the order-book and audit surfaces.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}
