//! Cart API handlers.
//!
//! Request bodies use `snake_case` keys; responses use `camelCase`.
//! Every handler requires an authenticated session.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use unlabel_core::{CartLineId, Price, ProductId, Quantity};

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CartLine, CartSummary};
use crate::services::CartError;
use crate::state::AppState;

/// One cart line as returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    pub quantity: Quantity,
    pub line_total: Price,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        Self {
            line_total: line.line_total(),
            id: line.id,
            product_id: line.product_id,
            name: line.name,
            price: line.price,
            image: line.image,
            quantity: line.quantity,
        }
    }
}

/// The whole cart.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_items: Vec<CartItemView>,
    pub item_count: u64,
    pub subtotal: Price,
}

impl From<CartSummary> for CartView {
    fn from(summary: CartSummary) -> Self {
        Self {
            cart_items: summary.lines.into_iter().map(CartItemView::from).collect(),
            item_count: summary.item_count,
            subtotal: summary.subtotal,
        }
    }
}

/// Response for a single changed line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub cart_item: CartItemView,
}

/// `POST /api/cart/items` body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Option<i64>,
    pub quantity: Option<i64>,
}

/// `PATCH /api/cart/items/{id}` body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<i64>,
}

fn invalid(message: impl Into<String>) -> AppError {
    CartError::InvalidInput(message.into()).into()
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| invalid(rejection.body_text()))
}

fn quantity(raw: Option<i64>) -> Result<Quantity> {
    let raw = raw.ok_or_else(|| invalid("Missing required field: quantity"))?;
    Ok(Quantity::try_from(raw).map_err(CartError::from)?)
}

fn line_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<CartLineId> {
    let Path(raw) = path.map_err(|_| invalid("Invalid cart item id"))?;
    i32::try_from(raw)
        .map(CartLineId::new)
        .map_err(|_| CartError::CartItemNotFound(CartLineId::new(0)).into())
}

/// `GET /api/cart` - the user's cart with totals.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let summary = state.cart().summary(user.id).await?;
    Ok(Json(summary.into()))
}

/// `POST /api/cart/items` - add a product, merging with an existing line.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<CartItemResponse>> {
    let request = body(payload)?;
    let raw_product = request
        .product_id
        .ok_or_else(|| invalid("Missing required field: product_id"))?;
    let quantity = quantity(request.quantity)?;

    // IDs outside the catalog's key range cannot exist.
    let product_id = i32::try_from(raw_product)
        .map(ProductId::new)
        .map_err(|_| CartError::ProductNotFound(ProductId::new(0)))?;

    let line = state
        .cart()
        .add_item(user.id, product_id, quantity)
        .await?;

    Ok(Json(CartItemResponse {
        cart_item: line.into(),
    }))
}

/// `PATCH /api/cart/items/{id}` - set a line's quantity.
#[instrument(skip(state, user, path, payload), fields(user_id = %user.id))]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<CartItemResponse>> {
    let id = line_id(path)?;
    let quantity = quantity(body(payload)?.quantity)?;

    let line = state
        .cart()
        .update_quantity(user.id, id, quantity)
        .await?;

    Ok(Json(CartItemResponse {
        cart_item: line.into(),
    }))
}

/// `DELETE /api/cart/items/{id}` - remove a line.
#[instrument(skip(state, user, path), fields(user_id = %user.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<StatusCode> {
    let id = line_id(path)?;
    state.cart().remove_item(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
