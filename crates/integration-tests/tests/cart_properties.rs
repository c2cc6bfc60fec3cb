//! Cart stock and merge behavior through the public services.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use unlabel_core::{CartLineId, Price, ProductId, UserId};
use unlabel_integration_tests::{catalog, qty};
use unlabel_storefront::services::{CartError, CartService};

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);
const TOTE: ProductId = ProductId::new(10);

#[tokio::test]
async fn test_add_succeeds_exactly_up_to_stock() {
    for stock in [1_u32, 3, 8] {
        let store = catalog(&[(10, "Canvas Tote", 1399, stock)]).await;
        let cart = CartService::new(&store);

        for q in 1..=stock {
            let user = UserId::new(100 + i32::try_from(q).unwrap());
            let line = cart.add_item(user, TOTE, qty(q)).await;
            assert!(line.is_ok(), "stock {stock}, quantity {q} should fit");
        }

        let over = cart.add_item(ALICE, TOTE, qty(stock + 1)).await;
        assert!(matches!(
            over,
            Err(CartError::InsufficientStock { product }) if product == TOTE
        ));
        assert!(cart.list_items(ALICE).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_second_add_merges_into_one_line() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 5)]).await;
    let cart = CartService::new(&store);

    cart.add_item(ALICE, TOTE, qty(2)).await.unwrap();
    let merged = cart.add_item(ALICE, TOTE, qty(3)).await.unwrap();
    assert_eq!(merged.quantity, qty(5));

    let lines = cart.list_items(ALICE).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, qty(5));
}

#[tokio::test]
async fn test_second_add_past_stock_keeps_first_quantity() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 5)]).await;
    let cart = CartService::new(&store);

    cart.add_item(ALICE, TOTE, qty(3)).await.unwrap();
    let result = cart.add_item(ALICE, TOTE, qty(3)).await;
    assert!(matches!(result, Err(CartError::InsufficientStock { .. })));

    let lines = cart.list_items(ALICE).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, qty(3));
}

#[tokio::test]
async fn test_update_past_stock_keeps_prior_quantity() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 4)]).await;
    let cart = CartService::new(&store);

    let line = cart.add_item(ALICE, TOTE, qty(2)).await.unwrap();
    let result = cart.update_quantity(ALICE, line.id, qty(5)).await;
    assert!(matches!(result, Err(CartError::InsufficientStock { .. })));
    assert_eq!(cart.list_items(ALICE).await.unwrap()[0].quantity, qty(2));

    // Replace, not add.
    let updated = cart.update_quantity(ALICE, line.id, qty(4)).await.unwrap();
    assert_eq!(updated.quantity, qty(4));
}

#[tokio::test]
async fn test_update_checks_current_stock() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 6)]).await;
    let cart = CartService::new(&store);
    let line = cart.add_item(ALICE, TOTE, qty(2)).await.unwrap();

    // Stock sold elsewhere after the line was added.
    let mut product = store.product(TOTE).await.unwrap();
    product.stock = 1;
    store.put_product(product).await;

    let result = cart.update_quantity(ALICE, line.id, qty(2)).await;
    assert!(matches!(result, Err(CartError::InsufficientStock { .. })));
}

#[tokio::test]
async fn test_unknown_product_and_line() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 6)]).await;
    let cart = CartService::new(&store);

    let missing = cart.add_item(ALICE, ProductId::new(99), qty(1)).await;
    assert!(matches!(missing, Err(CartError::ProductNotFound(_))));

    let ghost = CartLineId::new(12_345);
    assert!(matches!(
        cart.update_quantity(ALICE, ghost, qty(1)).await,
        Err(CartError::CartItemNotFound(_))
    ));
    assert!(matches!(
        cart.remove_item(ALICE, ghost).await,
        Err(CartError::CartItemNotFound(_))
    ));
}

#[tokio::test]
async fn test_other_users_lines_look_missing() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 6)]).await;
    let cart = CartService::new(&store);
    let line = cart.add_item(ALICE, TOTE, qty(1)).await.unwrap();

    assert!(matches!(
        cart.update_quantity(BOB, line.id, qty(2)).await,
        Err(CartError::CartItemNotFound(_))
    ));
    assert!(matches!(
        cart.remove_item(BOB, line.id).await,
        Err(CartError::CartItemNotFound(_))
    ));
    assert!(cart.list_items(BOB).await.unwrap().is_empty());
    assert_eq!(cart.list_items(ALICE).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_line_keeps_price_captured_at_add() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 6)]).await;
    let cart = CartService::new(&store);
    cart.add_item(ALICE, TOTE, qty(1)).await.unwrap();

    let mut product = store.product(TOTE).await.unwrap();
    product.price = Price::from_cents(2500);
    product.name = "Canvas Tote (new)".to_owned();
    store.put_product(product).await;

    let merged = cart.add_item(ALICE, TOTE, qty(1)).await.unwrap();
    assert_eq!(merged.price, Price::from_cents(1399));
    assert_eq!(merged.name, "Canvas Tote");

    let summary = cart.summary(ALICE).await.unwrap();
    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.subtotal, Price::from_cents(2798));
}

#[tokio::test]
async fn test_clear_cart_is_idempotent() {
    let store = catalog(&[(10, "Canvas Tote", 1399, 6), (11, "Enamel Pin", 500, 6)]).await;
    let cart = CartService::new(&store);
    cart.add_item(ALICE, TOTE, qty(1)).await.unwrap();
    cart.add_item(ALICE, ProductId::new(11), qty(2)).await.unwrap();

    assert_eq!(cart.clear_cart(ALICE).await.unwrap(), 2);
    assert_eq!(cart.clear_cart(ALICE).await.unwrap(), 0);
    assert!(cart.list_items(ALICE).await.unwrap().is_empty());
}
