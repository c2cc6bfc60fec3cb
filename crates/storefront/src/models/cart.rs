//! Cart line types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use unlabel_core::{CartLineId, Price, ProductId, Quantity, UserId};

use super::Product;

/// One (user, product) entry in a cart.
///
/// A user has at most one line per product; adding the same product again
/// merges into the existing line. Name, price, and image are the values
/// captured when the line was created and are what checkout charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// A cart line about to be inserted (owner comes from the transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    pub quantity: Quantity,
}

impl NewCartLine {
    /// Snapshot the product's current name, price, and image.
    #[must_use]
    pub fn snapshot(product: &Product, quantity: Quantity) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity,
        }
    }
}

/// A user's cart with its derived totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    /// Sum of quantities across lines.
    pub item_count: u64,
    /// Sum of line totals, before shipping.
    pub subtotal: Price,
}
