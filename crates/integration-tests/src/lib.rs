//! Integration tests for the Unlabel cart and checkout engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p unlabel-integration-tests
//! ```
//!
//! The tests drive the public services against the in-memory store, so no
//! database is needed. This crate holds the shared fixtures:
//!
//! - [`catalog`] - a [`MemoryStore`] preloaded with products
//! - [`FlakyStore`] - a store wrapper that fails purchase-line writes on
//!   demand, for checking that checkout rolls back everything

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use unlabel_core::{CartLineId, OrderId, Price, ProductId, Quantity, UserId};
use unlabel_storefront::db::RepositoryError;
use unlabel_storefront::models::{
    CartLine, NewCartLine, NewOrder, Order, OrderRecord, Product, PurchaseLine,
};
use unlabel_storefront::store::{CommerceStore, MemoryStore, StoreTransaction};

/// A product fixture: `(id, name, price in cents, stock)`.
pub type ProductSpec<'a> = (i32, &'a str, u32, u32);

/// A memory store holding the given products.
pub async fn catalog(products: &[ProductSpec<'_>]) -> MemoryStore {
    let store = MemoryStore::new();
    for &(id, name, cents, stock) in products {
        store
            .put_product(Product {
                id: ProductId::new(id),
                name: name.to_owned(),
                price: Price::from_cents(cents),
                stock,
                image: Some(format!("/img/{id}.jpg")),
            })
            .await;
    }
    store
}

/// Shorthand for a quantity known to be valid.
///
/// # Panics
///
/// Panics if `n` is zero.
#[must_use]
pub fn qty(n: u32) -> Quantity {
    Quantity::new(n).expect("fixture quantity must be at least one")
}

/// Store wrapper whose transactions fail purchase-line inserts once a
/// budget of successful inserts is used up.
///
/// The budget is shared by every transaction the store opens.
#[derive(Clone)]
pub struct FlakyStore {
    inner: MemoryStore,
    purchase_lines_left: Arc<AtomicUsize>,
}

impl FlakyStore {
    /// Allow `successful_lines` purchase-line inserts, then fail every one.
    #[must_use]
    pub fn new(inner: MemoryStore, successful_lines: usize) -> Self {
        Self {
            inner,
            purchase_lines_left: Arc::new(AtomicUsize::new(successful_lines)),
        }
    }

    /// The wrapped store, for inspecting state after a failure.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl CommerceStore for FlakyStore {
    async fn begin(&self, user: UserId) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        Ok(Box::new(FlakyTransaction {
            inner: self.inner.begin(user).await?,
            purchase_lines_left: Arc::clone(&self.purchase_lines_left),
        }))
    }

    async fn purchase_history(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.inner.purchase_history(user).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }
}

struct FlakyTransaction {
    inner: Box<dyn StoreTransaction>,
    purchase_lines_left: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreTransaction for FlakyTransaction {
    fn user(&self) -> UserId {
        self.inner.user()
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.inner.product(id).await
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.inner.lock_products(ids).await
    }

    async fn deduct_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        self.inner.deduct_stock(product, quantity).await
    }

    async fn cart_lines(&mut self) -> Result<Vec<CartLine>, RepositoryError> {
        self.inner.cart_lines().await
    }

    async fn cart_line(&mut self, id: CartLineId) -> Result<Option<CartLine>, RepositoryError> {
        self.inner.cart_line(id).await
    }

    async fn cart_line_for_product(
        &mut self,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.inner.cart_line_for_product(product).await
    }

    async fn insert_cart_line(&mut self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        self.inner.insert_cart_line(line).await
    }

    async fn set_cart_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        self.inner.set_cart_line_quantity(id, quantity).await
    }

    async fn delete_cart_line(&mut self, id: CartLineId) -> Result<bool, RepositoryError> {
        self.inner.delete_cart_line(id).await
    }

    async fn clear_cart(&mut self) -> Result<u64, RepositoryError> {
        self.inner.clear_cart().await
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.inner.insert_order(order).await
    }

    async fn insert_purchase_line(
        &mut self,
        order: OrderId,
        line: &CartLine,
    ) -> Result<PurchaseLine, RepositoryError> {
        let granted = self
            .purchase_lines_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if !granted {
            return Err(RepositoryError::DataCorruption(
                "injected purchase line failure".to_owned(),
            ));
        }
        self.inner.insert_purchase_line(order, line).await
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        self.inner.commit().await
    }
}
