//! Cart and checkout error types.

use thiserror::Error;

use unlabel_core::{CartLineId, ProductId, QuantityError};

use crate::db::RepositoryError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Missing or malformed input (e.g., quantity below one).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The catalog has no such product.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// No cart line with this ID belongs to the user.
    #[error("cart item {0} not found")]
    CartItemNotFound(CartLineId),

    /// The requested quantity exceeds current stock.
    #[error("insufficient stock for product {product}")]
    InsufficientStock {
        /// The product that cannot cover the request.
        product: ProductId,
    },

    /// Repository/database error.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Errors that can occur during checkout.
///
/// Every variant means nothing was written: the cart is exactly as it was.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Missing or malformed input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Not one of the fixed shipping options.
    #[error("invalid shipping option {0}")]
    InvalidShippingOption(i64),

    /// The user's cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line asks for more than the product's current stock.
    #[error("insufficient stock for product {product}")]
    InsufficientStock {
        /// The first product (by ID) that cannot cover its cart line.
        product: ProductId,
    },

    /// Repository/database error.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}
