//! Purchase history.

use tracing::instrument;

use unlabel_core::UserId;

use crate::db::RepositoryError;
use crate::models::OrderRecord;
use crate::store::CommerceStore;

/// Read-only view over the order ledger.
pub struct OrderHistoryService<'a> {
    store: &'a dyn CommerceStore,
}

impl<'a> OrderHistoryService<'a> {
    /// Create a new history service.
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore) -> Self {
        Self { store }
    }

    /// The user's orders, newest first, each with its purchase lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the ledger cannot be read.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn purchase_history(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.store.purchase_history(user).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use unlabel_core::{Price, ProductId, Quantity};

    use super::*;
    use crate::models::Product;
    use crate::services::{CartService, CheckoutService};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_history_newest_first_and_scoped() {
        let store = MemoryStore::new();
        store
            .put_product(Product {
                id: ProductId::new(1),
                name: "Mug".to_owned(),
                price: Price::from_cents(900),
                stock: 10,
                image: None,
            })
            .await;

        let user = UserId::new(1);
        let cart = CartService::new(&store);
        let checkout = CheckoutService::new(&store);

        cart.add_item(user, ProductId::new(1), Quantity::ONE).await.unwrap();
        let first = checkout.checkout(user, 1).await.unwrap();
        cart.add_item(user, ProductId::new(1), Quantity::new(2).unwrap())
            .await
            .unwrap();
        let second = checkout.checkout(user, 3).await.unwrap();

        let history = OrderHistoryService::new(&store)
            .purchase_history(user)
            .await
            .unwrap();
        let numbers: Vec<_> = history.iter().map(|r| r.order.id).collect();
        assert_eq!(numbers, vec![second.order.id, first.order.id]);
        assert_eq!(history[0].lines[0].quantity.get(), 2);

        let other = OrderHistoryService::new(&store)
            .purchase_history(UserId::new(2))
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
