//! Catalog product queries.
//!
//! The engine only reads products, locks them for checkout, and deducts
//! stock. [`upsert_product`] exists for seeding.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use tracing::{debug, instrument};

use unlabel_core::{Price, ProductId, Quantity};

use super::RepositoryError;
use crate::models::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
    image: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "product {} has negative stock {}",
                row.id, row.stock
            ))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price,
            stock,
            image: row.image,
        })
    }
}

/// Get a product by ID without locking it.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the row violates invariants.
pub async fn get_product(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let row: Option<ProductRow> = sqlx::query_as(
        r"
        SELECT id, name, price, stock, image
        FROM storefront.product
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(Product::try_from).transpose()
}

/// Lock product rows with `FOR UPDATE` until the transaction ends.
///
/// Rows are locked in ID order so concurrent checkouts over overlapping
/// products cannot deadlock. Unknown IDs are silently omitted.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails or a lock times out.
#[instrument(skip(conn), fields(count = ids.len()))]
pub async fn lock_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

    let rows: Vec<ProductRow> = sqlx::query_as(
        r"
        SELECT id, name, price, stock, image
        FROM storefront.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(Product::try_from).collect()
}

/// Subtract `quantity` from a product's stock.
///
/// This is the catalog side of the storage seam: only checkout calls it,
/// through `StoreTransaction::deduct_stock`, after locking the product rows
/// in the same transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if stock would go negative or the
/// product does not exist.
/// Returns `RepositoryError::Database` if the update fails.
#[instrument(skip(conn), fields(product_id = %id, quantity = %quantity))]
pub async fn deduct_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: Quantity,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.product
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "stock for product {id} would go negative"
        )));
    }

    debug!("Deducted stock");
    Ok(())
}

/// Insert a product or overwrite an existing one with the same ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the statement fails.
#[instrument(skip(executor, product), fields(product_id = %product.id))]
pub async fn upsert_product<'e>(
    executor: impl PgExecutor<'e>,
    product: &Product,
) -> Result<(), RepositoryError> {
    let stock = i32::try_from(product.stock).map_err(|_| {
        RepositoryError::Conflict(format!(
            "stock {} for product {} is out of range",
            product.stock, product.id
        ))
    })?;

    sqlx::query(
        r"
        INSERT INTO storefront.product (id, name, price, stock, image)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
        SET name = EXCLUDED.name,
            price = EXCLUDED.price,
            stock = EXCLUDED.stock,
            image = EXCLUDED.image,
            updated_at = NOW()
        ",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(product.price)
    .bind(stock)
    .bind(&product.image)
    .execute(executor)
    .await?;

    Ok(())
}
