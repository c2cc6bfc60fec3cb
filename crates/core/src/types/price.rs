//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are always in the store's single currency unit (dollars, not
//! cents) and are never negative. Arithmetic is exact: a line of three
//! 13.99 items totals 41.97, not 41.969999.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Quantity;

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),

    /// The amount exceeds [`Price::MAX_AMOUNT`].
    #[error("price cannot exceed {max} (got {0})", max = Price::MAX_AMOUNT)]
    TooLarge(Decimal),
}

/// A non-negative monetary amount.
///
/// ## Examples
///
/// ```
/// use unlabel_core::{Price, Quantity};
///
/// let unit = Price::from_cents(1399);
/// let line = unit.times(Quantity::new(3).unwrap());
/// assert_eq!(line.to_string(), "$41.97");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// The zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest amount accepted by [`Price::new`].
    ///
    /// A line at this unit price times `u32::MAX` units still fits in a
    /// `Decimal` with room left for summing.
    pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if the amount is below zero.
    /// Returns `PriceError::TooLarge` if the amount exceeds [`Price::MAX_AMOUNT`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Decimal::from(Self::MAX_AMOUNT) {
            return Err(PriceError::TooLarge(amount));
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// Saturates at `Decimal::MAX` instead of panicking.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity.get())))
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

impl Add for Price {
    type Output = Self;

    /// Saturates at `Decimal::MAX` instead of panicking.
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_rejected() {
        let result = Price::new(Decimal::new(-1, 2));
        assert!(matches!(result, Err(PriceError::Negative(_))));
    }

    #[test]
    fn test_oversized_price_rejected() {
        let max = Decimal::from(Price::MAX_AMOUNT);
        assert!(Price::new(max).is_ok());

        let over = max + Decimal::new(1, 2);
        assert_eq!(Price::new(over), Err(PriceError::TooLarge(over)));

        let result: Result<Price, _> = serde_json::from_str("\"79228162514264337593543950335\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_arithmetic_at_bounds_does_not_panic() {
        let max = Price::new(Decimal::from(Price::MAX_AMOUNT)).unwrap();
        let line = max.times(Quantity::new(u32::MAX).unwrap());
        assert_eq!(
            line.amount(),
            Decimal::from(Price::MAX_AMOUNT) * Decimal::from(u32::MAX)
        );

        let saturated = Price(Decimal::MAX);
        assert_eq!((saturated + line).amount(), Decimal::MAX);
        assert_eq!(
            saturated.times(Quantity::new(2).unwrap()).amount(),
            Decimal::MAX
        );
    }

    #[test]
    fn test_zero_price_allowed() {
        assert_eq!(Price::new(Decimal::ZERO).unwrap(), Price::ZERO);
    }

    #[test]
    fn test_times_is_exact() {
        let line = Price::from_cents(1399).times(Quantity::new(3).unwrap());
        assert_eq!(line.amount(), Decimal::new(4197, 2));
    }

    #[test]
    fn test_sum_and_add() {
        let subtotal: Price = [Price::from_cents(1399); 3].into_iter().sum();
        let total = subtotal + Price::from_cents(1599);
        assert_eq!(total.amount(), Decimal::new(5796, 2));
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Price::from_cents(599).to_string(), "$5.99");
        assert_eq!(Price::new(Decimal::new(5, 0)).unwrap().to_string(), "$5.00");
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        let result: Result<Price, _> = serde_json::from_str("\"-3.00\"");
        assert!(result.is_err());

        let price: Price = serde_json::from_str("\"13.99\"").unwrap();
        assert_eq!(price, Price::from_cents(1399));
    }
}
