//! In-process [`CommerceStore`].
//!
//! Mirrors the locking behaviour of the `PostgreSQL` store: one async mutex
//! per user cart, one per product row, and writes staged inside the
//! transaction until commit. Nothing is persisted across restarts.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use unlabel_core::{CartLineId, OrderId, ProductId, PurchaseLineId, Quantity, UserId};

use super::{CommerceStore, StoreTransaction};
use crate::db::RepositoryError;
use crate::models::{CartLine, NewCartLine, NewOrder, Order, OrderRecord, Product, PurchaseLine};

type LockMap<K> = Mutex<HashMap<K, Arc<Mutex<()>>>>;

/// In-memory store. Cheap to clone; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    data: Mutex<Data>,
    cart_locks: LockMap<UserId>,
    product_locks: LockMap<ProductId>,
    next_cart_line: AtomicI32,
    next_order: AtomicI32,
    next_purchase_line: AtomicI32,
}

#[derive(Default)]
struct Data {
    products: BTreeMap<ProductId, Product>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: Vec<OrderRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a catalog product.
    pub async fn put_product(&self, product: Product) {
        self.inner
            .data
            .lock()
            .await
            .products
            .insert(product.id, product);
    }

    /// Current catalog state of a product.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.inner.data.lock().await.products.get(&id).cloned()
    }
}

impl Inner {
    fn next_id(counter: &AtomicI32) -> i32 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

async fn acquire<K: Eq + Hash + Copy>(locks: &LockMap<K>, key: K) -> OwnedMutexGuard<()> {
    let lock = {
        let mut locks = locks.lock().await;
        Arc::clone(locks.entry(key).or_default())
    };
    lock.lock_owned().await
}

#[async_trait]
impl CommerceStore for MemoryStore {
    async fn begin(&self, user: UserId) -> Result<Box<dyn StoreTransaction>, RepositoryError> {
        let cart_guard = acquire(&self.inner.cart_locks, user).await;
        let cart = self
            .inner
            .data
            .lock()
            .await
            .carts
            .get(&user)
            .cloned()
            .unwrap_or_default();

        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            user,
            cart_guard: Some(cart_guard),
            product_guards: BTreeMap::new(),
            cart,
            deductions: BTreeMap::new(),
            orders: Vec::new(),
        }))
    }

    async fn purchase_history(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        let data = self.inner.data.lock().await;
        let mut records: Vec<OrderRecord> = data
            .orders
            .iter()
            .filter(|record| record.order.user_id == user)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then_with(|| b.order.id.cmp(&a.order.id))
        });
        Ok(records)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

struct MemoryTransaction {
    inner: Arc<Inner>,
    user: UserId,
    /// `None` once committed.
    cart_guard: Option<OwnedMutexGuard<()>>,
    product_guards: BTreeMap<ProductId, OwnedMutexGuard<()>>,
    /// Working copy of the user's cart.
    cart: Vec<CartLine>,
    deductions: BTreeMap<ProductId, u32>,
    orders: Vec<OrderRecord>,
}

impl MemoryTransaction {
    fn ensure_open(&self) -> Result<(), RepositoryError> {
        if self.cart_guard.is_none() {
            return Err(RepositoryError::Conflict(
                "transaction already committed".to_owned(),
            ));
        }
        Ok(())
    }

    fn pending_deduction(&self, product: ProductId) -> u32 {
        self.deductions.get(&product).copied().unwrap_or(0)
    }

    fn with_pending_deduction(&self, mut product: Product) -> Product {
        product.stock = product
            .stock
            .saturating_sub(self.pending_deduction(product.id));
        product
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    fn user(&self) -> UserId {
        self.user
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.ensure_open()?;
        let product = self.inner.data.lock().await.products.get(&id).cloned();
        Ok(product.map(|p| self.with_pending_deduction(p)))
    }

    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.ensure_open()?;
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        for id in &ids {
            if !self.product_guards.contains_key(id) {
                let guard = acquire(&self.inner.product_locks, *id).await;
                self.product_guards.insert(*id, guard);
            }
        }

        let data = self.inner.data.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| data.products.get(id).cloned())
            .map(|p| self.with_pending_deduction(p))
            .collect())
    }

    async fn deduct_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        self.ensure_open()?;
        if !self.product_guards.contains_key(&product) {
            return Err(RepositoryError::Conflict(format!(
                "product {product} must be locked before its stock changes"
            )));
        }

        let stock = self
            .inner
            .data
            .lock()
            .await
            .products
            .get(&product)
            .map(|p| p.stock)
            .ok_or(RepositoryError::NotFound)?;

        let already = self.pending_deduction(product);
        let total = already.saturating_add(quantity.get());
        if total > stock {
            return Err(RepositoryError::Conflict(format!(
                "stock for product {product} would go negative"
            )));
        }
        self.deductions.insert(product, total);
        Ok(())
    }

    async fn cart_lines(&mut self) -> Result<Vec<CartLine>, RepositoryError> {
        self.ensure_open()?;
        Ok(self.cart.clone())
    }

    async fn cart_line(&mut self, id: CartLineId) -> Result<Option<CartLine>, RepositoryError> {
        self.ensure_open()?;
        Ok(self.cart.iter().find(|line| line.id == id).cloned())
    }

    async fn cart_line_for_product(
        &mut self,
        product: ProductId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        self.ensure_open()?;
        Ok(self
            .cart
            .iter()
            .find(|line| line.product_id == product)
            .cloned())
    }

    async fn insert_cart_line(&mut self, line: NewCartLine) -> Result<CartLine, RepositoryError> {
        self.ensure_open()?;
        if self.cart.iter().any(|l| l.product_id == line.product_id) {
            return Err(RepositoryError::Conflict(format!(
                "cart already has a line for product {}",
                line.product_id
            )));
        }

        let line = CartLine {
            id: CartLineId::new(Inner::next_id(&self.inner.next_cart_line)),
            user_id: self.user,
            product_id: line.product_id,
            name: line.name,
            price: line.price,
            image: line.image,
            quantity: line.quantity,
            created_at: Utc::now(),
        };
        self.cart.push(line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &mut self,
        id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        self.ensure_open()?;
        let Some(line) = self.cart.iter_mut().find(|line| line.id == id) else {
            return Ok(false);
        };
        line.quantity = quantity;
        Ok(true)
    }

    async fn delete_cart_line(&mut self, id: CartLineId) -> Result<bool, RepositoryError> {
        self.ensure_open()?;
        let before = self.cart.len();
        self.cart.retain(|line| line.id != id);
        Ok(self.cart.len() != before)
    }

    async fn clear_cart(&mut self) -> Result<u64, RepositoryError> {
        self.ensure_open()?;
        let removed = self.cart.len() as u64;
        self.cart.clear();
        Ok(removed)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order, RepositoryError> {
        self.ensure_open()?;
        let order = Order {
            id: OrderId::new(Inner::next_id(&self.inner.next_order)),
            order_number: order.order_number,
            user_id: self.user,
            total: order.total,
            status: order.status,
            created_at: Utc::now(),
        };
        self.orders.push(OrderRecord {
            order: order.clone(),
            lines: Vec::new(),
        });
        Ok(order)
    }

    async fn insert_purchase_line(
        &mut self,
        order: OrderId,
        line: &CartLine,
    ) -> Result<PurchaseLine, RepositoryError> {
        self.ensure_open()?;
        let id = PurchaseLineId::new(Inner::next_id(&self.inner.next_purchase_line));
        let record = self
            .orders
            .iter_mut()
            .find(|record| record.order.id == order)
            .ok_or(RepositoryError::NotFound)?;

        let purchase = PurchaseLine {
            id,
            order_id: order,
            product_id: line.product_id,
            name: line.name.clone(),
            price: line.price,
            image: line.image.clone(),
            quantity: line.quantity,
        };
        record.lines.push(purchase.clone());
        Ok(purchase)
    }

    async fn commit(&mut self) -> Result<(), RepositoryError> {
        self.ensure_open()?;
        let mut data = self.inner.data.lock().await;

        // Validate every deduction before applying any write.
        for (product, quantity) in &self.deductions {
            let stock = data.products.get(product).map_or(0, |p| p.stock);
            if *quantity > stock {
                return Err(RepositoryError::Conflict(format!(
                    "stock for product {product} would go negative"
                )));
            }
        }

        for (product, quantity) in std::mem::take(&mut self.deductions) {
            if let Some(p) = data.products.get_mut(&product) {
                p.stock -= quantity;
            }
        }

        let cart = std::mem::take(&mut self.cart);
        if cart.is_empty() {
            data.carts.remove(&self.user);
        } else {
            data.carts.insert(self.user, cart);
        }
        data.orders.append(&mut self.orders);
        drop(data);

        self.product_guards.clear();
        self.cart_guard = None;
        Ok(())
    }
}
