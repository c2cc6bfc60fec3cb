//! Unlabel storefront: cart and checkout engine.
//!
//! This crate provides the engine as a library, allowing it to be tested and
//! reused; `main.rs` wires it to configuration, telemetry, and a listener.
//!
//! # Layers
//!
//! - [`store`] - storage seam ([`store::CommerceStore`]) with a memory
//!   implementation; [`db`] holds the `PostgreSQL` one
//! - [`services`] - cart, checkout, and history logic
//! - [`routes`] / [`middleware`] - thin JSON API over the services

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use axum::{Router, body::Body, http::Request};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Build the full application router.
///
/// Layers, innermost first: request ID, session, HTTP tracing, Sentry.
pub fn app<S>(state: AppState, session_store: S, rate_limiter: Option<RateLimiterLayer>) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(session_store, state.config());

    routes::routes(rate_limiter)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                user_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
