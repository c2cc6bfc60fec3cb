//! Catalog product as seen by the engine.

use serde::{Deserialize, Serialize};

use unlabel_core::{Price, ProductId, Quantity};

/// A catalog product (read-only to the cart and checkout engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Price,
    /// Units on hand.
    pub stock: u32,
    /// Image path or URL.
    pub image: Option<String>,
}

impl Product {
    /// Whether `quantity` units can be covered by current stock.
    #[must_use]
    pub const fn covers(&self, quantity: Quantity) -> bool {
        quantity.get() <= self.stock
    }
}
