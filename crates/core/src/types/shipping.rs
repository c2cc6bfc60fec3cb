//! Fixed shipping table.
//!
//! Shipping is a flat price per option, chosen at checkout. The ids are part
//! of the public API contract (`shipping_option_id` 1, 2, or 3).

use serde::Serialize;

use super::Price;

/// A shipping option offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingOption {
    /// Option 1, 5.99.
    Standard,
    /// Option 2, 15.99.
    Express,
    /// Option 3, 29.99.
    Overnight,
}

impl ShippingOption {
    /// Every option, in id order.
    pub const ALL: [Self; 3] = [Self::Standard, Self::Express, Self::Overnight];

    /// Look up an option by its public id.
    #[must_use]
    pub const fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Standard),
            2 => Some(Self::Express),
            3 => Some(Self::Overnight),
            _ => None,
        }
    }

    /// The public id of this option.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Standard => 1,
            Self::Express => 2,
            Self::Overnight => 3,
        }
    }

    /// Flat price charged for this option.
    #[must_use]
    pub fn price(self) -> Price {
        match self {
            Self::Standard => Price::from_cents(599),
            Self::Express => Price::from_cents(1599),
            Self::Overnight => Price::from_cents(2999),
        }
    }
}
