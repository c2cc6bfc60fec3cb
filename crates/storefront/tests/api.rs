//! HTTP API tests against the in-memory store.
//!
//! Each test builds the real router with a memory session store and logs in
//! through a test-only route that writes the session the way the account
//! service would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode, header},
    routing::post,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::Session;

use unlabel_core::{Price, ProductId, UserId};
use unlabel_storefront::config::StorefrontConfig;
use unlabel_storefront::middleware::{create_session_layer, set_current_user};
use unlabel_storefront::models::{CurrentUser, Product};
use unlabel_storefront::routes;
use unlabel_storefront::state::AppState;
use unlabel_storefront::store::MemoryStore;

fn memory_config() -> StorefrontConfig {
    StorefrontConfig::from_lookup(|key| match key {
        "STOREFRONT_STORE" => Some("memory".to_owned()),
        _ => None,
    })
    .unwrap()
}

async fn login(session: Session, Path(id): Path<i32>) -> StatusCode {
    set_current_user(&session, &CurrentUser { id: UserId::new(id) })
        .await
        .unwrap();
    StatusCode::NO_CONTENT
}

struct TestApp {
    router: Router,
    store: MemoryStore,
}

impl TestApp {
    async fn new() -> Self {
        let store = MemoryStore::new();
        store
            .put_product(Product {
                id: ProductId::new(1),
                name: "Canvas Tote".to_owned(),
                price: Price::from_cents(1399),
                stock: 10,
                image: Some("/img/tote.jpg".to_owned()),
            })
            .await;
        store
            .put_product(Product {
                id: ProductId::new(2),
                name: "Enamel Pin".to_owned(),
                price: Price::from_cents(500),
                stock: 1,
                image: None,
            })
            .await;

        let config = memory_config();
        let session_layer =
            create_session_layer(tower_sessions::MemoryStore::default(), &config);
        let state = AppState::new(config, Arc::new(store.clone()));

        let router = routes::routes(None)
            .route("/test/login/{id}", post(login))
            .layer(session_layer)
            .with_state(state);

        Self { router, store }
    }

    async fn login(&self, user: i32) -> String {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::post(format!("/test/login/{user}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_owned()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));

    let (status, _) = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cart_requires_authentication() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Not authenticated" }));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/checkout",
            None,
            Some(json!({ "shipping_option_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_merge_and_show_cart() {
    let app = TestApp::new().await;
    let cookie = app.login(1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 1, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItem"]["productId"], 1);
    assert_eq!(body["cartItem"]["quantity"], 2);
    assert_eq!(body["cartItem"]["price"], "13.99");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 1, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItem"]["quantity"], 3);
    assert_eq!(body["cartItem"]["lineTotal"], "41.97");

    let (status, body) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItems"].as_array().unwrap().len(), 1);
    assert_eq!(body["itemCount"], 3);
    assert_eq!(body["subtotal"], "41.97");
}

#[tokio::test]
async fn test_add_item_validation() {
    let app = TestApp::new().await;
    let cookie = app.login(1).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 1, "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("product_id"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 999, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 2, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["productId"], 2);

    // Nothing was written by the failed calls.
    let (_, body) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(body["itemCount"], 0);
}

#[tokio::test]
async fn test_update_and_remove_item() {
    let app = TestApp::new().await;
    let cookie = app.login(1).await;

    let (_, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&cookie),
            Some(json!({ "product_id": 1, "quantity": 1 })),
        )
        .await;
    let id = body["cartItem"]["id"].as_i64().unwrap();
    let uri = format!("/api/cart/items/{id}");

    let (status, body) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&cookie),
            Some(json!({ "quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItem"]["quantity"], 5);

    let (status, _) = app
        .send(
            Method::PATCH,
            &uri,
            Some(&cookie),
            Some(json!({ "quantity": 11 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lines_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let alice = app.login(1).await;
    let bob = app.login(2).await;

    let (_, body) = app
        .send(
            Method::POST,
            "/api/cart/items",
            Some(&alice),
            Some(json!({ "product_id": 1, "quantity": 1 })),
        )
        .await;
    let uri = format!("/api/cart/items/{}", body["cartItem"]["id"]);

    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&bob), Some(json!({ "quantity": 2 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.send(Method::GET, "/api/cart", Some(&alice), None).await;
    assert_eq!(body["itemCount"], 1);
}

#[tokio::test]
async fn test_checkout_and_purchase_history() {
    let app = TestApp::new().await;
    let cookie = app.login(7).await;

    app.send(
        Method::POST,
        "/api/cart/items",
        Some(&cookie),
        Some(json!({ "product_id": 1, "quantity": 3 })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&cookie),
            Some(json!({ "shipping_option_id": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtotal"], "41.97");
    assert_eq!(body["shipping"], "15.99");
    assert_eq!(body["total"], "57.96");
    assert_eq!(body["itemCount"], 1);
    let order_id = body["orderId"].as_str().unwrap().to_owned();
    assert!(order_id.starts_with("ORD-"));

    let (_, cart) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(cart["itemCount"], 0);
    assert_eq!(
        app.store.product(ProductId::new(1)).await.unwrap().stock,
        7
    );

    let (status, body) = app
        .send(Method::GET, "/api/purchases", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let purchases = body["purchases"].as_array().unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0]["id"], order_id.as_str());
    assert_eq!(purchases[0]["status"], "completed");
    assert_eq!(purchases[0]["total"], "57.96");
    assert_eq!(purchases[0]["trackingNumber"], Value::Null);
    assert_eq!(purchases[0]["items"][0]["name"], "Canvas Tote");
    assert_eq!(purchases[0]["items"][0]["quantity"], 3);
}

#[tokio::test]
async fn test_checkout_rejections() {
    let app = TestApp::new().await;
    let cookie = app.login(3).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&cookie),
            Some(json!({ "shipping_option_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cart is empty");

    app.send(
        Method::POST,
        "/api/cart/items",
        Some(&cookie),
        Some(json!({ "product_id": 2, "quantity": 1 })),
    )
    .await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&cookie),
            Some(json!({ "shipping_option_id": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, "/api/checkout", Some(&cookie), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Stock sold elsewhere after the line was added.
    app.store
        .put_product(Product {
            id: ProductId::new(2),
            name: "Enamel Pin".to_owned(),
            price: Price::from_cents(500),
            stock: 0,
            image: None,
        })
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/checkout",
            Some(&cookie),
            Some(json!({ "shipping_option_id": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["productId"], 2);

    let (_, cart) = app.send(Method::GET, "/api/cart", Some(&cookie), None).await;
    assert_eq!(cart["itemCount"], 1);

    let (_, history) = app
        .send(Method::GET, "/api/purchases", Some(&cookie), None)
        .await;
    assert_eq!(history["purchases"].as_array().unwrap().len(), 0);
}
