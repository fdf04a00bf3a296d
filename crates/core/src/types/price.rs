//! Type-safe price representation using decimal arithmetic.
//!
//! The remote API is currency-agnostic: prices are plain decimal numbers with
//! no currency code attached, and the storefront decides how to present them.
//! `Price` guarantees non-negativity, which the cart and checkout code rely
//! on when computing line totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A non-negative decimal amount in the store's display currency.
///
/// Deserialization goes through [`TryFrom<Decimal>`], so a negative value in
/// an API payload is rejected at the parse boundary rather than surfacing as
/// a negative subtotal later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Total for a cart line: unit price times quantity.
    ///
    /// Saturates instead of overflowing; cart quantities are small, so the
    /// saturation path is unreachable in practice.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }

    /// Saturating addition, used when summing line totals.
    #[must_use]
    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl From<u32> for Price {
    fn from(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }
}

impl std::str::FromStr for Price {
    type Err = PriceError;

    /// Parse a decimal string such as a form field value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| PriceError::Unparseable(s.to_string()))?;
        Self::new(amount)
    }
}

/// Errors constructing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The amount was negative.
    #[error("price cannot be negative: {0}")]
    Negative(Decimal),
    /// The string was not a decimal number.
    #[error("not a price: {0:?}")]
    Unparseable(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amounts() {
        let err = Price::new(Decimal::from(-5)).unwrap_err();
        assert_eq!(err, PriceError::Negative(Decimal::from(-5)));
        assert!(Price::new(Decimal::ZERO).is_ok());
    }

    #[test]
    fn line_total_multiplies_by_quantity() {
        let price = Price::new(Decimal::from(10)).unwrap();
        assert_eq!(price.line_total(3), Price::new(Decimal::from(30)).unwrap());
        assert_eq!(price.line_total(0), Price::ZERO);
    }

    #[test]
    fn display_uses_two_decimal_places() {
        let price = Price::new(Decimal::new(1999, 2)).unwrap();
        assert_eq!(price.to_string(), "19.99");
        assert_eq!(Price::from(7u32).to_string(), "7.00");
    }

    #[test]
    fn deserializes_from_numbers_and_strings() {
        let from_number: Price = serde_json::from_str("12.5").unwrap();
        let from_string: Price = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(from_number, from_string);
    }

    #[test]
    fn deserialize_rejects_negative() {
        let result: Result<Price, _> = serde_json::from_str("-3");
        assert!(result.is_err());
    }

    #[test]
    fn summing_line_totals() {
        let a = Price::from(10u32).line_total(2);
        let b = Price::from(5u32).line_total(1);
        assert_eq!(a.saturating_add(b), Price::from(25u32));
    }

    #[test]
    fn parses_form_input() {
        assert_eq!(" 19.99 ".parse::<Price>().unwrap().to_string(), "19.99");
        assert!(matches!(
            "abc".parse::<Price>(),
            Err(PriceError::Unparseable(_))
        ));
        assert!(matches!(
            "-4".parse::<Price>(),
            Err(PriceError::Negative(_))
        ));
    }
}
