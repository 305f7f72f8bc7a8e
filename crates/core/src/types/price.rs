//! Type-safe unit price using decimal arithmetic.
//!
//! Prices are strictly positive. Totals (which may be zero) are plain
//! [`Decimal`] values produced by [`Price::extend`].

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Price is zero or negative.
    #[error("price must be greater than 0")]
    NotPositive,

    /// Price is above [`Price::MAX`].
    #[error("price cannot exceed {max}")]
    TooLarge {
        /// Largest accepted unit price.
        max: Decimal,
    },
}

/// A strictly positive unit price.
///
/// ```
/// use emporium_core::{Price, Quantity};
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1050, 2)).unwrap();
/// let qty = Quantity::new(3).unwrap();
/// assert_eq!(price.extend(qty), Some(Decimal::new(3150, 2)));
///
/// assert!(Price::new(Decimal::ZERO).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Largest accepted unit price (one billion).
    pub const MAX: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` if `amount <= 0` and
    /// `PriceError::TooLarge` if `amount > Price::MAX`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    /// The price amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units, or `None` if it does not fit a `Decimal`.
    #[must_use]
    pub fn extend(&self, quantity: Quantity) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity.get()))
    }

    /// Signed price of a quantity delta (negative when the quantity shrinks).
    #[must_use]
    pub fn extend_delta(&self, delta: i64) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(delta))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Price::new(Decimal::ZERO), Err(PriceError::NotPositive));
        assert_eq!(Price::new(Decimal::new(-1, 0)), Err(PriceError::NotPositive));
    }

    #[test]
    fn test_extend_delta_signed() {
        let price = Price::new(Decimal::new(10, 0)).unwrap();
        assert_eq!(price.extend_delta(-3), Some(Decimal::new(-30, 0)));
        assert_eq!(price.extend_delta(2), Some(Decimal::new(20, 0)));
    }

    #[test]
    fn test_rejects_above_max() {
        assert!(Price::new(Price::MAX).is_ok());
        assert_eq!(
            Price::new(Decimal::MAX / Decimal::new(2, 0)),
            Err(PriceError::TooLarge { max: Price::MAX })
        );
        assert!(serde_json::from_str::<Price>("\"1000000000.01\"").is_err());
    }

    #[test]
    fn test_extend_at_max_fits() {
        let price = Price::new(Price::MAX).unwrap();
        let qty = Quantity::new(i64::from(Quantity::MAX)).unwrap();
        assert_eq!(
            price.extend(qty),
            Some(Price::MAX * Decimal::from(Quantity::MAX))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Price = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(ok.amount(), Decimal::new(1999, 2));

        let from_number: Price = serde_json::from_str("5").unwrap();
        assert_eq!(from_number.amount(), Decimal::new(5, 0));

        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
    }

    #[test]
    fn test_display_two_places() {
        let price = Price::new(Decimal::new(5, 0)).unwrap();
        assert_eq!(price.to_string(), "5.00");
    }
}
