//! Type-safe price representation using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price must have at most two decimal places")]
    TooPrecise,
    /// The amount does not fit the storage column.
    #[error("price must be below {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A product price in the shop currency.
///
/// Stored as `NUMERIC(10, 2)`, so amounts are non-negative, carry at most two
/// decimal places, and stay below 100 000 000.
///
/// ```
/// use rust_decimal::Decimal;
/// use vitrine_core::Price;
///
/// let price = Price::new(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "19.99");
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Exclusive upper bound imposed by the `NUMERIC(10, 2)` column.
    pub const MAX: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount >= Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Returns the amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whole_and_cent_amounts() {
        assert_eq!(Price::new(Decimal::new(45, 0)).unwrap().to_string(), "45.00");
        assert_eq!(Price::new(Decimal::ZERO).unwrap().amount(), Decimal::ZERO);
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        // 12.5000 normalizes to 12.5
        assert!(Price::new(Decimal::new(125_000, 4)).is_ok());
        assert_eq!(
            Price::new(Decimal::new(12_345, 3)),
            Err(PriceError::TooPrecise)
        );
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Price::new(Decimal::new(-5, 1)), Err(PriceError::Negative));
        assert!(matches!(
            Price::new(Price::MAX),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn deserializes_from_string_amounts() {
        let price: Price = serde_json::from_str("\"89.90\"").unwrap();
        assert_eq!(price.amount(), Decimal::new(8990, 2));
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
