//! Order ledger queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use unlabel_core::{
    OrderId, OrderNumber, OrderStatus, Price, ProductId, PurchaseLineId, Quantity, UserId,
};

use super::RepositoryError;
use crate::models::{CartLine, NewOrder, Order, OrderRecord, PurchaseLine};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    order_number: String,
    user_id: i32,
    total: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let order_number = OrderNumber::parse(&row.order_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;
        let total = Price::new(row.total)
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", row.id)))?;

        Ok(Self {
            id: OrderId::new(row.id),
            order_number,
            user_id: UserId::new(row.user_id),
            total,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PurchaseLineRow {
    id: i32,
    order_id: i32,
    product_id: i32,
    name: String,
    price: Decimal,
    image: Option<String>,
    quantity: i32,
}

impl TryFrom<PurchaseLineRow> for PurchaseLine {
    type Error = RepositoryError;

    fn try_from(row: PurchaseLineRow) -> Result<Self, Self::Error> {
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("purchase line {}: {e}", row.id))
        };
        let price = Price::new(row.price).map_err(|e| corrupt(&e))?;
        let quantity = Quantity::try_from(row.quantity).map_err(|e| corrupt(&e))?;

        Ok(Self {
            id: PurchaseLineId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price,
            image: row.image,
            quantity,
        })
    }
}

/// Insert an order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number is already taken.
/// Returns `RepositoryError::Database` for other database errors.
#[instrument(skip(conn, order), fields(user_id = %user, order_number = %order.order_number))]
pub async fn insert_order(
    conn: &mut PgConnection,
    user: UserId,
    order: NewOrder,
) -> Result<Order, RepositoryError> {
    let row: OrderRow = sqlx::query_as(
        r"
        INSERT INTO storefront.customer_order (order_number, user_id, total, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id, order_number, user_id, total, status, created_at
        ",
    )
    .bind(order.order_number.as_str())
    .bind(user)
    .bind(order.total)
    .bind(order.status)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::unique_or_database(e, "order number already exists"))?;

    debug!(order_id = row.id, "Inserted order");
    Order::try_from(row)
}

/// Snapshot a cart line under an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_purchase_line(
    conn: &mut PgConnection,
    order: OrderId,
    line: &CartLine,
) -> Result<PurchaseLine, RepositoryError> {
    let row: PurchaseLineRow = sqlx::query_as(
        r"
        INSERT INTO storefront.purchase_line
            (order_id, product_id, name, price, image, quantity)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, order_id, product_id, name, price, image, quantity
        ",
    )
    .bind(order)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(line.price)
    .bind(&line.image)
    .bind(line.quantity)
    .fetch_one(conn)
    .await?;

    PurchaseLine::try_from(row)
}

/// All of a user's orders, newest first, each with its lines.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
/// Returns `RepositoryError::DataCorruption` if a row violates invariants.
#[instrument(skip(pool), fields(user_id = %user))]
pub async fn history(pool: &PgPool, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
    let orders: Vec<OrderRow> = sqlx::query_as(
        r"
        SELECT id, order_number, user_id, total, status, created_at
        FROM storefront.customer_order
        WHERE user_id = $1
        ORDER BY created_at DESC, id DESC
        ",
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let lines: Vec<PurchaseLineRow> = sqlx::query_as(
        r"
        SELECT id, order_id, product_id, name, price, image, quantity
        FROM storefront.purchase_line
        WHERE order_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(&order_ids)
    .fetch_all(pool)
    .await?;

    let mut by_order: HashMap<OrderId, Vec<PurchaseLine>> = HashMap::new();
    for row in lines {
        let line = PurchaseLine::try_from(row)?;
        by_order.entry(line.order_id).or_default().push(line);
    }

    orders
        .into_iter()
        .map(|row| {
            let order = Order::try_from(row)?;
            let lines = by_order.remove(&order.id).unwrap_or_default();
            Ok(OrderRecord { order, lines })
        })
        .collect()
}
