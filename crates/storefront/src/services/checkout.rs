//! Checkout service.
//!
//! Turns a user's cart into one order, one purchase line per cart line, and
//! an empty cart, inside a single store transaction. Any failure drops the
//! transaction, which rolls back every write.

use tracing::{debug, info, instrument, warn};

use unlabel_core::{OrderNumber, OrderStatus, Price, ProductId, ShippingOption, UserId};

use super::CheckoutError;
use super::pricing;
use crate::db::RepositoryError;
use crate::models::{NewOrder, Order, PurchaseLine};
use crate::store::CommerceStore;

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order: Order,
    pub shipping: ShippingOption,
    /// Sum of purchase line totals, before shipping.
    pub subtotal: Price,
    /// Flat shipping price.
    pub shipping_price: Price,
    pub lines: Vec<PurchaseLine>,
}

impl Receipt {
    /// The identifier shown to the customer.
    #[must_use]
    pub const fn order_number(&self) -> &OrderNumber {
        &self.order.order_number
    }

    /// Subtotal plus shipping.
    #[must_use]
    pub const fn total(&self) -> Price {
        self.order.total
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// Check out the user's cart with the given shipping option.
    ///
    /// Totals use the price captured on each cart line. Stock is re-read
    /// under a row lock for every product in the cart and deducted before
    /// commit, so two checkouts competing for the last units cannot both
    /// succeed.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidShippingOption` for an unknown option.
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines.
    /// Returns `CheckoutError::InsufficientStock` naming the first product
    /// whose stock no longer covers its line.
    /// Returns `CheckoutError::Storage` if any write fails.
    ///
    /// On every error the cart, the ledger, and stock are unchanged.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn checkout(
        &self,
        user: UserId,
        shipping_option_id: i64,
    ) -> Result<Receipt, CheckoutError> {
        let shipping = ShippingOption::from_id(shipping_option_id)
            .ok_or(CheckoutError::InvalidShippingOption(shipping_option_id))?;

        let mut tx = self.store.begin(user).await?;

        let cart = tx.cart_lines().await?;
        if cart.is_empty() {
            debug!("Checkout rejected: cart is empty");
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal = pricing::subtotal(&cart);
        let total = pricing::total(subtotal, shipping);

        let product_ids: Vec<ProductId> = pricing::requested_by_product(&cart)
            .into_keys()
            .collect();
        let products = tx.lock_products(&product_ids).await?;
        if let Err(product) = pricing::validate_stock(&cart, &products) {
            warn!(product_id = %product, "Checkout rejected: insufficient stock");
            return Err(CheckoutError::InsufficientStock { product });
        }

        let order_number = OrderNumber::generate(&mut rand::rng());
        let order = tx
            .insert_order(NewOrder {
                order_number,
                total,
                status: OrderStatus::Completed,
            })
            .await?;

        let mut lines = Vec::with_capacity(cart.len());
        for line in &cart {
            lines.push(tx.insert_purchase_line(order.id, line).await?);
        }

        for line in &cart {
            tx.deduct_stock(line.product_id, line.quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(_) => CheckoutError::InsufficientStock {
                        product: line.product_id,
                    },
                    other => CheckoutError::Storage(other),
                })?;
        }

        tx.clear_cart().await?;
        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            lines = lines.len(),
            "Checkout completed"
        );

        Ok(Receipt {
            order,
            shipping,
            subtotal,
            shipping_price: shipping.price(),
            lines,
        })
    }
}
