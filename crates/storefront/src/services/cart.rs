//! Cart service.
//!
//! Stock is checked, never reserved: every add and update re-reads the
//! product and rejects quantities it cannot cover, but nothing is held back
//! for the cart. Checkout does the authoritative check.

use tracing::{debug, instrument, warn};

use unlabel_core::{CartLineId, ProductId, Quantity, UserId};

use super::CartError;
use super::pricing;
use crate::models::{CartLine, CartSummary, NewCartLine};
use crate::store::CommerceStore;

/// Cart service.
///
/// Every call takes the user explicitly and runs in one store transaction
/// holding that user's cart lock.
pub struct CartService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// Add `quantity` units of a product, merging into an existing line.
    ///
    /// A merged line keeps the name, price, and image captured when it was
    /// first created.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the catalog has no such product.
    /// Returns `CartError::InsufficientStock` if the new line quantity would
    /// exceed stock; the cart is left unchanged.
    #[instrument(skip(self), fields(user_id = %user, product_id = %product_id, quantity = %quantity))]
    pub async fn add_item(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        let mut tx = self.store.begin(user).await?;

        let product = tx
            .product(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let insufficient = CartError::InsufficientStock {
            product: product_id,
        };

        let line = if let Some(existing) = tx.cart_line_for_product(product_id).await? {
            let Some(merged) = existing
                .quantity
                .checked_add(quantity)
                .filter(|q| product.covers(*q))
            else {
                debug!(stock = product.stock, existing = %existing.quantity, "Merged quantity exceeds stock");
                return Err(insufficient);
            };

            if !tx.set_cart_line_quantity(existing.id, merged).await? {
                return Err(CartError::CartItemNotFound(existing.id));
            }
            CartLine {
                quantity: merged,
                ..existing
            }
        } else {
            if !product.covers(quantity) {
                debug!(stock = product.stock, "Quantity exceeds stock");
                return Err(insufficient);
            }
            tx.insert_cart_line(NewCartLine::snapshot(&product, quantity))
                .await?
        };

        tx.commit().await?;
        debug!(cart_line_id = %line.id, quantity = %line.quantity, "Cart line saved");
        Ok(line)
    }

    /// Set a line's quantity (absolute, not additive).
    ///
    /// A product that has left the catalog is treated as out of stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartItemNotFound` if the user has no such line.
    /// Returns `CartError::InsufficientStock` if `quantity` exceeds stock.
    #[instrument(skip(self), fields(user_id = %user, cart_line_id = %line_id, quantity = %quantity))]
    pub async fn update_quantity(
        &self,
        user: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        let mut tx = self.store.begin(user).await?;

        let line = tx
            .cart_line(line_id)
            .await?
            .ok_or(CartError::CartItemNotFound(line_id))?;

        let stock = tx.product(line.product_id).await?.map_or(0, |p| p.stock);
        if quantity.get() > stock {
            debug!(stock, "Quantity exceeds stock");
            return Err(CartError::InsufficientStock {
                product: line.product_id,
            });
        }

        if !tx.set_cart_line_quantity(line_id, quantity).await? {
            return Err(CartError::CartItemNotFound(line_id));
        }
        tx.commit().await?;

        Ok(CartLine { quantity, ..line })
    }

    /// Delete one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CartItemNotFound` if no line matched, including
    /// when the line belongs to another user.
    #[instrument(skip(self), fields(user_id = %user, cart_line_id = %line_id))]
    pub async fn remove_item(&self, user: UserId, line_id: CartLineId) -> Result<(), CartError> {
        let mut tx = self.store.begin(user).await?;

        if !tx.delete_cart_line(line_id).await? {
            warn!("Cart line not found for removal");
            return Err(CartError::CartItemNotFound(line_id));
        }

        tx.commit().await?;
        Ok(())
    }

    /// The user's cart lines, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read.
    pub async fn list_items(&self, user: UserId) -> Result<Vec<CartLine>, CartError> {
        let mut tx = self.store.begin(user).await?;
        Ok(tx.cart_lines().await?)
    }

    /// Remove every line from the user's cart. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be written.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn clear_cart(&self, user: UserId) -> Result<u64, CartError> {
        let mut tx = self.store.begin(user).await?;
        let removed = tx.clear_cart().await?;
        tx.commit().await?;
        Ok(removed)
    }

    /// The user's cart with item count and subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be read.
    pub async fn summary(&self, user: UserId) -> Result<CartSummary, CartError> {
        let lines = self.list_items(user).await?;
        Ok(CartSummary {
            item_count: pricing::item_count(&lines),
            subtotal: pricing::subtotal(&lines),
            lines,
        })
    }
}
