//! Order ledger types.
//!
//! An [`Order`] and its [`PurchaseLine`]s are written together by a single
//! checkout transaction and never modified afterwards.

use chrono::{DateTime, Utc};
use serde::Serialize;

use unlabel_core::{
    OrderId, OrderNumber, OrderStatus, Price, ProductId, PurchaseLineId, Quantity, UserId,
};

/// A committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Identifier shown to the customer.
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Cart subtotal plus shipping.
    pub total: Price,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// An order about to be inserted (owner comes from the transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub total: Price,
    pub status: OrderStatus,
}

/// Snapshot of one cart line under a committed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseLine {
    pub id: PurchaseLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    pub quantity: Quantity,
}

/// An order together with its purchase lines, as read back for history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub order: Order,
    pub lines: Vec<PurchaseLine>,
}
