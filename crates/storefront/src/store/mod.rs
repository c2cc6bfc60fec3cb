//! Storage seam for the cart and checkout engine.
//!
//! The engine never touches a connection pool directly. It opens a
//! [`StoreTransaction`] for one user through a [`CommerceStore`], performs
//! its reads and writes, and commits. A transaction that is dropped without
//! [`StoreTransaction::commit`] rolls back and leaves no trace.
//!
//! # Locking
//!
//! - Opening a transaction takes the user's cart lock. Every mutation and
//!   every checkout for the same user is serialized; different users never
//!   wait on each other here.
//! - [`StoreTransaction::lock_products`] takes write-intent locks on product
//!   rows until the transaction ends. Checkout uses it so that the stock it
//!   validates is the stock it deducts from.
//!
//! # Implementations
//!
//! - [`crate::db::PgStore`] - `PostgreSQL` via sqlx
//! - [`MemoryStore`] - in-process, for tests and local development; seeded
//!   from a [`catalog_file`]

pub mod catalog_file;
pub mod memory;

use async_trait::async_trait;

use unlabel_core::{CartLineId, OrderId, ProductId, Quantity, UserId};

use crate::db::RepositoryError;
use crate::models::{CartLine, NewCartLine, NewOrder, Order, OrderRecord, Product, PurchaseLine};

pub use catalog_file::{CatalogFileError, parse_catalog, read_catalog};
pub use memory::MemoryStore;

/// Entry point to persistent storage.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Begin a transaction scoped to `user`, taking the user's cart lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction cannot start or
    /// the lock cannot be taken in time.
    async fn begin(&self, user: UserId) -> Result<Box<dyn StoreTransaction>, RepositoryError>;

    /// All committed orders for `user`, newest first, with their lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the ledger cannot be read.
    async fn purchase_history(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError>;

    /// Check that the backing storage is reachable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if it is not.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// A unit of work over one user's cart, the catalog, and the order ledger.
///
/// Cart reads and writes are implicitly scoped to [`StoreTransaction::user`];
/// a cart line owned by someone else is indistinguishable from a missing one.
#[async_trait]
pub trait StoreTransaction: Send {
    /// The user this transaction is scoped to.
    fn user(&self) -> UserId;

    // Catalog

    /// Look up a product without locking it.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Lock the given product rows for the rest of the transaction and return
    /// their current state, ordered by ID. Unknown IDs are omitted.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Remove `quantity` units from a product locked by this transaction.
    ///
    /// Checkout is the only caller; cart operations re-check stock but never
    /// consume it.
    ///
    /// Fails with `RepositoryError::Conflict` if stock would go negative.
    async fn deduct_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError>;

    // Cart

    /// All of the user's cart lines, oldest first.
    async fn cart_lines(&mut self) -> Result<Vec<CartLine>, RepositoryError>;

    /// One of the user's cart lines by ID.
    async fn cart_line(&mut self, id: CartLineId) -> Result<Option<CartLine>, RepositoryError>;

    /// The user's cart line for `product`, if any.
    async fn cart_line_for_product(
        &mut self,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Insert a new cart line for the user.
    ///
    /// Fails with `RepositoryError::Conflict` if the user already has a line
    /// for the product.
    async fn insert_cart_line(&mut self, line: NewCartLine) -> Result<CartLine, RepositoryError>;

    /// Replace the quantity of one of the user's lines. Returns whether a
    /// line matched.
    async fn set_cart_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Delete one of the user's lines. Returns whether a line matched.
    async fn delete_cart_line(&mut self, id: CartLineId) -> Result<bool, RepositoryError>;

    /// Delete all of the user's lines. Returns how many were removed.
    async fn clear_cart(&mut self) -> Result<u64, RepositoryError>;

    // Ledger

    /// Insert an order owned by the user.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Snapshot a cart line under an order inserted by this transaction.
    async fn insert_purchase_line(
        &mut self,
        order: OrderId,
        line: &CartLine,
    ) -> Result<PurchaseLine, RepositoryError>;

    /// Make every write of this transaction durable and release its locks.
    ///
    /// Any further call on the transaction fails.
    async fn commit(&mut self) -> Result<(), RepositoryError>;
}
