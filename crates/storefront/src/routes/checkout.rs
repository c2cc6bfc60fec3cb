//! Checkout API handler.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use unlabel_core::{OrderNumber, Price};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::{CheckoutError, Receipt};
use crate::state::AppState;

/// `POST /api/checkout` body.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_option_id: Option<i64>,
}

/// Successful checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order_id: OrderNumber,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub item_count: usize,
}

impl From<Receipt> for CheckoutResponse {
    fn from(receipt: Receipt) -> Self {
        Self {
            subtotal: receipt.subtotal,
            shipping: receipt.shipping_price,
            total: receipt.total(),
            item_count: receipt.lines.len(),
            order_id: receipt.order.order_number,
        }
    }
}

/// `POST /api/checkout` - turn the cart into an order.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) =
        payload.map_err(|rejection| CheckoutError::InvalidInput(rejection.body_text()))?;
    let shipping_option_id = request.shipping_option_id.ok_or_else(|| {
        CheckoutError::InvalidInput("Missing required field: shipping_option_id".to_owned())
    })?;

    let receipt = state
        .checkout()
        .checkout(user.id, shipping_option_id)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", receipt.order_number().as_str())]),
    );

    Ok(Json(receipt.into()))
}
