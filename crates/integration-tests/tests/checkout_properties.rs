//! Checkout totals, atomicity, and oversell protection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use tokio::task::JoinSet;

use unlabel_core::{OrderStatus, Price, ProductId, UserId};
use unlabel_integration_tests::{FlakyStore, catalog, qty};
use unlabel_storefront::services::{
    CartService, CheckoutError, CheckoutService, OrderHistoryService,
};
use unlabel_storefront::store::MemoryStore;

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

async fn order_count(store: &MemoryStore, user: UserId) -> usize {
    OrderHistoryService::new(store)
        .purchase_history(user)
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_empty_cart_creates_no_order() {
    let store = catalog(&[(1, "Canvas Tote", 1399, 5)]).await;

    let result = CheckoutService::new(&store).checkout(ALICE, 1).await;
    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert_eq!(order_count(&store, ALICE).await, 0);
}

#[tokio::test]
async fn test_unknown_shipping_option_touches_nothing() {
    let store = catalog(&[(1, "Canvas Tote", 1399, 5)]).await;
    CartService::new(&store)
        .add_item(ALICE, ProductId::new(1), qty(1))
        .await
        .unwrap();

    for option in [0, 4, -1] {
        let result = CheckoutService::new(&store).checkout(ALICE, option).await;
        assert!(matches!(
            result,
            Err(CheckoutError::InvalidShippingOption(id)) if id == option
        ));
    }
    assert_eq!(
        CartService::new(&store).list_items(ALICE).await.unwrap().len(),
        1
    );
    assert_eq!(order_count(&store, ALICE).await, 0);
}

#[tokio::test]
async fn test_three_items_with_express_shipping() {
    let store = catalog(&[
        (1, "Canvas Tote", 1399, 5),
        (2, "Linen Tote", 1399, 5),
        (3, "Denim Tote", 1399, 5),
    ])
    .await;
    let cart = CartService::new(&store);
    for id in 1..=3 {
        cart.add_item(ALICE, ProductId::new(id), qty(1)).await.unwrap();
    }

    let receipt = CheckoutService::new(&store).checkout(ALICE, 2).await.unwrap();
    assert_eq!(receipt.subtotal, Price::from_cents(4197));
    assert_eq!(receipt.shipping_price, Price::from_cents(1599));
    assert_eq!(receipt.total(), Price::from_cents(5796));
    assert_eq!(receipt.lines.len(), 3);

    assert!(cart.list_items(ALICE).await.unwrap().is_empty());

    let history = OrderHistoryService::new(&store)
        .purchase_history(ALICE)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].order.total, Price::from_cents(5796));
    assert_eq!(history[0].order.status, OrderStatus::Completed);
    assert_eq!(&history[0].order.order_number, receipt.order_number());
    assert_eq!(history[0].lines.len(), 3);
}

#[tokio::test]
async fn test_failed_purchase_line_rolls_back_everything() {
    let inner = catalog(&[
        (1, "Canvas Tote", 1399, 5),
        (2, "Enamel Pin", 500, 5),
        (3, "Sticker Pack", 300, 5),
    ])
    .await;
    let cart = CartService::new(&inner);
    for id in 1..=3 {
        cart.add_item(ALICE, ProductId::new(id), qty(2)).await.unwrap();
    }
    let before = cart.list_items(ALICE).await.unwrap();

    // Second purchase line fails.
    let flaky = FlakyStore::new(inner.clone(), 1);
    let result = CheckoutService::new(&flaky).checkout(ALICE, 1).await;
    assert!(matches!(result, Err(CheckoutError::Storage(_))));

    assert_eq!(cart.list_items(ALICE).await.unwrap(), before);
    assert_eq!(order_count(flaky.inner(), ALICE).await, 0);
    for id in 1..=3 {
        let product = inner.product(ProductId::new(id)).await.unwrap();
        assert_eq!(product.stock, 5);
    }

    // The preserved cart can be checked out once storage recovers.
    let receipt = CheckoutService::new(&inner).checkout(ALICE, 1).await.unwrap();
    assert_eq!(receipt.lines.len(), 3);
    assert!(cart.list_items(ALICE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stock_drop_after_add_fails_and_preserves_cart() {
    let store = catalog(&[(1, "Canvas Tote", 1399, 5), (2, "Enamel Pin", 500, 5)]).await;
    let cart = CartService::new(&store);
    cart.add_item(ALICE, ProductId::new(1), qty(2)).await.unwrap();
    cart.add_item(ALICE, ProductId::new(2), qty(4)).await.unwrap();
    let before = cart.list_items(ALICE).await.unwrap();

    let mut pin = store.product(ProductId::new(2)).await.unwrap();
    pin.stock = 3;
    store.put_product(pin).await;

    let result = CheckoutService::new(&store).checkout(ALICE, 1).await;
    assert!(matches!(
        result,
        Err(CheckoutError::InsufficientStock { product }) if product == ProductId::new(2)
    ));
    assert_eq!(cart.list_items(ALICE).await.unwrap(), before);
    assert_eq!(store.product(ProductId::new(1)).await.unwrap().stock, 5);

    // Adjust and retry.
    let line = before.iter().find(|l| l.product_id == ProductId::new(2)).unwrap();
    cart.update_quantity(ALICE, line.id, qty(3)).await.unwrap();
    CheckoutService::new(&store).checkout(ALICE, 1).await.unwrap();
    assert_eq!(store.product(ProductId::new(2)).await.unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_cannot_oversell() {
    for _ in 0..20 {
        let store = catalog(&[(1, "Canvas Tote", 1399, 5)]).await;
        let cart = CartService::new(&store);
        cart.add_item(ALICE, ProductId::new(1), qty(3)).await.unwrap();
        cart.add_item(BOB, ProductId::new(1), qty(3)).await.unwrap();

        let mut tasks = JoinSet::new();
        for user in [ALICE, BOB] {
            let store = store.clone();
            tasks.spawn(async move {
                (user, CheckoutService::new(&store).checkout(user, 1).await)
            });
        }

        let mut succeeded = Vec::new();
        let mut rejected = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                (user, Ok(_)) => succeeded.push(user),
                (user, Err(CheckoutError::InsufficientStock { product })) => {
                    assert_eq!(product, ProductId::new(1));
                    rejected.push(user);
                }
                (_, Err(other)) => panic!("unexpected checkout error: {other}"),
            }
        }

        assert_eq!(succeeded.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(store.product(ProductId::new(1)).await.unwrap().stock, 2);

        // The loser's cart survives for a retry.
        let left = cart.list_items(rejected[0]).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].quantity, qty(3));
        assert!(cart.list_items(succeeded[0]).await.unwrap().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_buyers_for_limited_stock() {
    let store = catalog(&[(1, "Enamel Pin", 500, 5)]).await;
    let buyers: Vec<UserId> = (100..120).map(UserId::new).collect();
    for &user in &buyers {
        CartService::new(&store)
            .add_item(user, ProductId::new(1), qty(1))
            .await
            .unwrap();
    }

    let mut tasks = JoinSet::new();
    for user in buyers {
        let store = store.clone();
        tasks.spawn(async move { CheckoutService::new(&store).checkout(user, 3).await });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(_) => completed += 1,
            Err(CheckoutError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected checkout error: {other}"),
        }
    }

    assert_eq!(completed, 5);
    assert_eq!(store.product(ProductId::new(1)).await.unwrap().stock, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_double_submit_places_one_order() {
    let store = catalog(&[(1, "Canvas Tote", 1399, 5)]).await;
    CartService::new(&store)
        .add_item(ALICE, ProductId::new(1), qty(2))
        .await
        .unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let store = store.clone();
        tasks.spawn(async move { CheckoutService::new(&store).checkout(ALICE, 1).await });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.unwrap());
    }

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(CheckoutError::EmptyCart)))
    );
    assert_eq!(order_count(&store, ALICE).await, 1);
    assert_eq!(store.product(ProductId::new(1)).await.unwrap().stock, 3);
}
