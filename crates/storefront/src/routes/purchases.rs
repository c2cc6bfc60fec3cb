//! Purchase history handler.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use unlabel_core::{OrderNumber, OrderStatus, Price, ProductId, Quantity};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{OrderRecord, PurchaseLine};
use crate::state::AppState;

/// One purchased item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemView {
    /// Product ID.
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: Quantity,
    pub image: Option<String>,
}

impl From<PurchaseLine> for PurchaseItemView {
    fn from(line: PurchaseLine) -> Self {
        Self {
            id: line.product_id,
            name: line.name,
            price: line.price,
            quantity: line.quantity,
            image: line.image,
        }
    }
}

/// One order in the history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseView {
    /// Order number.
    pub id: OrderNumber,
    pub date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Price,
    pub items: Vec<PurchaseItemView>,
    /// Shipment tracking is not modeled; always `null`.
    pub tracking_number: Option<String>,
}

impl From<OrderRecord> for PurchaseView {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: record.order.order_number,
            date: record.order.created_at,
            status: record.order.status,
            total: record.order.total,
            items: record.lines.into_iter().map(Into::into).collect(),
            tracking_number: None,
        }
    }
}

/// Purchase history response.
#[derive(Debug, Serialize)]
pub struct PurchasesResponse {
    pub purchases: Vec<PurchaseView>,
}

/// `GET /api/purchases` - the user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<PurchasesResponse>> {
    let records = state.history().purchase_history(user.id).await?;
    Ok(Json(PurchasesResponse {
        purchases: records.into_iter().map(Into::into).collect(),
    }))
}
