//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! - `product` - Catalog products (written by the catalog, read and
//!   stock-deducted here)
//! - `cart_line` - One row per (user, product) in a cart
//! - `customer_order` - Committed orders
//! - `purchase_line` - Snapshotted cart lines under an order
//!
//! Sessions live in `tower_sessions.session`, managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p unlabel-cli -- migrate
//! ```

pub mod cart;
pub mod catalog;
pub mod orders;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::instrument;

use unlabel_core::{CartLineId, OrderId, ProductId, Quantity, UserId};

use crate::models::{CartLine, NewCartLine, NewOrder, Order, OrderRecord, Product, PurchaseLine};
use crate::store::{CommerceStore, StoreTransaction};

/// First key of the two-key advisory lock that serializes a user's cart.
///
/// The second key is the user ID.
pub const CART_LOCK_NAMESPACE: i32 = 0x4341_5254; // "CART"

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate cart line, stock underflow).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict`, anything else to
    /// `Database`.
    pub(crate) fn unique_or_database(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// [`CommerceStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    /// Wrap a pool. `lock_timeout` bounds how long a transaction waits for a
    /// cart or product lock before failing.
    #[must_use]
    pub const fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    #[instrument(skip(self), fields(user_id = %user))]
    async fn begin(&self, user: UserId) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(CART_LOCK_NAMESPACE)
            .bind(user.as_i32())
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTransaction { user, tx: Some(tx) }))
    }

    async fn purchase_history(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        orders::history(&self.pool, user).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// An open `PostgreSQL` transaction holding a user's cart lock.
///
/// Dropping it without committing rolls back and releases every lock.
struct PgTransaction {
    user: UserId,
    /// `None` once committed.
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, RepositoryError> {
        self.tx.as_deref_mut().ok_or_else(|| {
            RepositoryError::Conflict("transaction already committed".to_owned())
        })
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    fn user(&self) -> UserId {
        self.user
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        catalog::get_product(self.conn()?, id).await
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        catalog::lock_products(self.conn()?, ids).await
    }

    async fn deduct_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        catalog::deduct_stock(self.conn()?, product, quantity).await
    }

    async fn cart_lines(&mut self) -> Result<Vec<CartLine>, RepositoryError> {
        let user = self.user;
        cart::list(self.conn()?, user).await
    }

    async fn cart_line(&mut self, id: CartLineId) -> Result<Option<CartLine>, RepositoryError> {
        let user = self.user;
        cart::get(self.conn()?, user, id).await
    }

    async fn cart_line_for_product(
        &mut self,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let user = self.user;
        cart::get_for_product(self.conn()?, user, product).await
    }

    async fn insert_cart_line(&mut self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        let user = self.user;
        cart::insert(self.conn()?, user, line).await
    }

    async fn set_cart_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let user = self.user;
        cart::set_quantity(self.conn()?, user, id, quantity).await
    }

    async fn delete_cart_line(&mut self, id: CartLineId) -> Result<bool, RepositoryError> {
        let user = self.user;
        cart::delete(self.conn()?, user, id).await
    }

    async fn clear_cart(&mut self) -> Result<u64, RepositoryError> {
        let user = self.user;
        cart::clear(self.conn()?, user).await
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        let user = self.user;
        orders::insert_order(self.conn()?, user, order).await
    }

    async fn insert_purchase_line(
        &mut self,
        order: OrderId,
        line: &CartLine,
    ) -> Result<PurchaseLine, RepositoryError> {
        orders::insert_purchase_line(self.conn()?, order, line).await
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let tx = self.tx.take().ok_or_else(|| {
            RepositoryError::Conflict("transaction already committed".to_owned())
        })?;
        tx.commit().await?;
        Ok(())
    }
}
