//! Human-shareable order numbers.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// Missing the `ORD-` prefix.
    #[error("order number must start with {prefix}")]
    MissingPrefix {
        /// Expected prefix.
        prefix: &'static str,
    },
    /// Suffix has the wrong length.
    #[error("order number suffix must be {expected} characters (got {got})")]
    WrongLength {
        /// Expected suffix length.
        expected: usize,
        /// Actual suffix length.
        got: usize,
    },
    /// Suffix contains something other than `A-Z` / `0-9`.
    #[error("order number suffix may only contain A-Z and 0-9")]
    InvalidCharacter,
}

/// The identifier a customer quotes when asking about an order.
///
/// ## Format
///
/// `ORD-` followed by eight characters from `A-Z0-9`, e.g. `ORD-7K2QX9AB`.
///
/// ## Examples
///
/// ```
/// use unlabel_core::OrderNumber;
///
/// assert!(OrderNumber::parse("ORD-7K2QX9AB").is_ok());
/// assert!(OrderNumber::parse("ord-7k2qx9ab").is_err());
/// assert!(OrderNumber::parse("ORD-123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by every order number.
    pub const PREFIX: &'static str = "ORD-";

    /// Number of random characters after the prefix.
    pub const SUFFIX_LEN: usize = 8;

    /// Generate a fresh order number.
    ///
    /// Uniqueness is enforced by the ledger's unique index; 36^8 combinations
    /// keep collisions rare enough that a clash surfaces as a storage error.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..Self::SUFFIX_LEN)
            .map(|_| {
                let digit = rng.random_range(0..36_u32);
                char::from_digit(digit, 36).map_or('0', |c| c.to_ascii_uppercase())
            })
            .collect();
        Self(format!("{}{suffix}", Self::PREFIX))
    }

    /// Parse an order number from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, length, or character set is wrong.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let suffix = s
            .strip_prefix(Self::PREFIX)
            .ok_or(OrderNumberError::MissingPrefix {
                prefix: Self::PREFIX,
            })?;

        if suffix.len() != Self::SUFFIX_LEN {
            return Err(OrderNumberError::WrongLength {
                expected: Self::SUFFIX_LEN,
                got: suffix.len(),
            });
        }

        if !suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(OrderNumberError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0.as_str(), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_generated_numbers_parse() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let number = OrderNumber::generate(&mut rng);
            assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
            assert_eq!(number.as_str().len(), 12);
        }
    }

    #[test]
    fn test_generated_numbers_differ() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = OrderNumber::generate(&mut rng);
        let b = OrderNumber::generate(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            OrderNumber::parse("XYZ-12345678"),
            Err(OrderNumberError::MissingPrefix { prefix: "ORD-" })
        );
        assert_eq!(
            OrderNumber::parse("ORD-1234"),
            Err(OrderNumberError::WrongLength {
                expected: 8,
                got: 4
            })
        );
        assert_eq!(
            OrderNumber::parse("ORD-1234abcd"),
            Err(OrderNumberError::InvalidCharacter)
        );
    }
}
