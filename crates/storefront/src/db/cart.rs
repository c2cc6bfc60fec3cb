//! Cart line queries.
//!
//! Every query is filtered by `user_id`: a line that belongs to someone else
//! behaves exactly like a missing one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;
use tracing::{debug, instrument};

use unlabel_core::{CartLineId, Price, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{CartLine, NewCartLine};

const CART_LINE_COLUMNS: &str =
    "id, user_id, product_id, name, price, image, quantity, created_at";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    user_id: i32,
    product_id: i32,
    name: String,
    price: Decimal,
    image: Option<String>,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("cart line {}: {e}", row.id))
        })?;
        let quantity = Quantity::try_from(row.quantity).map_err(|e| {
            RepositoryError::DataCorruption(format!("cart line {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price,
            image: row.image,
            quantity,
            created_at: row.created_at,
        })
    }
}

/// All of a user's cart lines, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a row violates invariants.
pub async fn list(conn: &mut PgConnection, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
    let rows: Vec<CartLineRow> = sqlx::query_as(&format!(
        "SELECT {CART_LINE_COLUMNS} FROM storefront.cart_line \
         WHERE user_id = $1 ORDER BY created_at, id"
    ))
    .bind(user)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// One of a user's cart lines by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(
    conn: &mut PgConnection,
    user: UserId,
    id: CartLineId,
) -> Result<Option<CartLine>, RepositoryError> {
    let row: Option<CartLineRow> = sqlx::query_as(&format!(
        "SELECT {CART_LINE_COLUMNS} FROM storefront.cart_line \
         WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user)
    .fetch_optional(conn)
    .await?;

    row.map(CartLine::try_from).transpose()
}

/// A user's cart line for a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_product(
    conn: &mut PgConnection,
    user: UserId,
    product: ProductId,
) -> Result<Option<CartLine>, RepositoryError> {
    let row: Option<CartLineRow> = sqlx::query_as(&format!(
        "SELECT {CART_LINE_COLUMNS} FROM storefront.cart_line \
         WHERE user_id = $1 AND product_id = $2"
    ))
    .bind(user)
    .bind(product)
    .fetch_optional(conn)
    .await?;

    row.map(CartLine::try_from).transpose()
}

/// Insert a new cart line.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already has a line for the
/// product.
/// Returns `RepositoryError::Database` for other database errors.
#[instrument(skip(conn, line), fields(user_id = %user, product_id = %line.product_id))]
pub async fn insert(
    conn: &mut PgConnection,
    user: UserId,
    line: NewCartLine,
) -> Result<CartLine, RepositoryError> {
    let row: CartLineRow = sqlx::query_as(&format!(
        "INSERT INTO storefront.cart_line (user_id, product_id, name, price, image, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {CART_LINE_COLUMNS}"
    ))
    .bind(user)
    .bind(line.product_id)
    .bind(&line.name)
    .bind(line.price)
    .bind(&line.image)
    .bind(line.quantity)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::unique_or_database(e, "cart already has a line for product"))?;

    debug!(cart_line_id = row.id, "Inserted cart line");
    CartLine::try_from(row)
}

/// Replace the quantity of one of a user's lines. Returns whether it matched.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_quantity(
    conn: &mut PgConnection,
    user: UserId,
    id: CartLineId,
    quantity: Quantity,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.cart_line
        SET quantity = $3
        WHERE id = $1 AND user_id = $2
        ",
    )
    .bind(id)
    .bind(user)
    .bind(quantity)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete one of a user's lines. Returns whether it matched.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn delete(
    conn: &mut PgConnection,
    user: UserId,
    id: CartLineId,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.cart_line WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user)
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete all of a user's lines. Returns how many were removed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the delete fails.
pub async fn clear(conn: &mut PgConnection, user: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM storefront.cart_line WHERE user_id = $1")
        .bind(user)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(quantity: i32) -> CartLineRow {
        CartLineRow {
            id: 3,
            user_id: 1,
            product_id: 42,
            name: "Hoodie".to_owned(),
            price: Decimal::new(4500, 2),
            image: None,
            quantity,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts() {
        let line = CartLine::try_from(row(2)).unwrap();
        assert_eq!(line.product_id, ProductId::new(42));
        assert_eq!(line.line_total(), Price::from_cents(9000));
    }

    #[test]
    fn test_zero_quantity_is_corruption() {
        let result = CartLine::try_from(row(0));
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
