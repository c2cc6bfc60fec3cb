//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                - Liveness check
//! GET    /health/ready          - Readiness check (store ping)
//!
//! # Cart (requires auth)
//! GET    /api/cart              - Cart lines, item count, subtotal
//! POST   /api/cart/items        - Add item {product_id, quantity}
//! PATCH  /api/cart/items/{id}   - Set quantity {quantity}
//! DELETE /api/cart/items/{id}   - Remove item
//!
//! # Checkout (requires auth)
//! POST   /api/checkout          - Place order {shipping_option_id}
//! GET    /api/purchases         - Purchase history
//! ```

pub mod cart;
pub mod checkout;
pub mod health;
pub mod purchases;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Create the JSON API router (mounted under `/api`).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/checkout", post(checkout::checkout))
        .route("/purchases", get(purchases::index))
}

/// Create all routes for the storefront.
///
/// The rate limiter, when given, guards `/api` only.
pub fn routes(rate_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let api = match rate_limiter {
        Some(limiter) => api_routes().layer(limiter),
        None => api_routes(),
    };

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api)
}
