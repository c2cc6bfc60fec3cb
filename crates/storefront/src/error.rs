//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Response bodies are JSON: `{"error": "..."}`, plus `"productId"` when a
//! stock check failed so the client can point at the offending line.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use unlabel_core::ProductId;

use crate::db::RepositoryError;
use crate::services::{CartError, CheckoutError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

impl AppError {
    /// Whether this is our fault rather than the client's.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Cart(CartError::Storage(_))
                | Self::Checkout(CheckoutError::Storage(_))
        )
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound(_) | CartError::CartItemNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                CartError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CartError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidInput(_) | CheckoutError::InvalidShippingOption(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::EmptyCart | CheckoutError::InsufficientStock { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Cart(err) => match err {
                CartError::InvalidInput(msg) => msg.clone(),
                CartError::ProductNotFound(_) => "Product not found".to_owned(),
                CartError::CartItemNotFound(_) => "Cart item not found".to_owned(),
                CartError::InsufficientStock { .. } => {
                    "Requested quantity exceeds available stock".to_owned()
                }
                CartError::Storage(_) => "Internal server error".to_owned(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidInput(msg) => msg.clone(),
                CheckoutError::InvalidShippingOption(_) => "Invalid shipping option".to_owned(),
                CheckoutError::EmptyCart => "Cart is empty".to_owned(),
                CheckoutError::InsufficientStock { .. } => {
                    "Insufficient stock for an item in your cart".to_owned()
                }
                CheckoutError::Storage(_) => "Internal server error".to_owned(),
            },
            Self::Database(_) => "Internal server error".to_owned(),
        }
    }

    const fn product(&self) -> Option<ProductId> {
        match self {
            Self::Cart(CartError::InsufficientStock { product })
            | Self::Checkout(CheckoutError::InsufficientStock { product }) => Some(*product),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = match self.product() {
            Some(product) => json!({ "error": self.message(), "productId": product }),
            None => json!({ "error": self.message() }),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
