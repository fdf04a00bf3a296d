//! Order assembly and submission against the mock.
//!
//! The rule under test: lines without a product id never reach the order
//! endpoint, and a cart with nothing orderable refuses before any request
//! goes out.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::{Value, json};

use velora_api::orders::{CheckoutError, OrderDraft};
use velora_core::BearerToken;
use velora_integration_tests::MockApi;

#[tokio::test]
async fn display_only_lines_are_dropped_before_submission() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.seed_cart(&json!([
        {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 28, "quantity": 2},
        {"_id": "line2", "name": "Sample Sachet", "price": 0, "quantity": 1},
        {"_id": "line3", "productId": "p3", "name": "Cloud Cream", "price": 34, "quantity": 1}
    ]));

    let items = client.fetch_cart_items(&token).await.unwrap();
    let draft = OrderDraft::assemble(&items, "12 Orchard Lane", "").unwrap();
    assert_eq!(draft.items().len(), 2);
    assert_eq!(draft.total().to_string(), "90.00");

    let order_id = client.create_order(&token, &draft).await.unwrap();
    assert_eq!(order_id.as_str(), "order-1");

    let received = mock.orders_received();
    assert_eq!(received.len(), 1);
    let lines = received[0]["items"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert!(
        lines
            .iter()
            .all(|line| line.get("productId").and_then(Value::as_str).is_some())
    );
    assert_eq!(received[0]["shippingAddress"], json!("12 Orchard Lane"));
}

#[tokio::test]
async fn nothing_orderable_refuses_before_any_request() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.seed_cart(&json!([
        {"_id": "line1", "name": "Sample Sachet", "price": 0, "quantity": 1}
    ]));

    let items = client.fetch_cart_items(&token).await.unwrap();
    let err = OrderDraft::assemble(&items, "12 Orchard Lane", "").unwrap_err();
    assert!(matches!(err, CheckoutError::NoOrderableLines));

    let err = OrderDraft::assemble(&[], "12 Orchard Lane", "").unwrap_err();
    assert!(matches!(err, CheckoutError::NoOrderableLines));

    assert_eq!(mock.order_posts(), 0);
}

#[tokio::test]
async fn order_submission_with_a_stale_token_is_unauthorized() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.seed_cart(&json!([
        {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 28, "quantity": 1}
    ]));
    let items = client.fetch_cart_items(&token).await.unwrap();
    let draft = OrderDraft::assemble(&items, "12 Orchard Lane", "").unwrap();

    let err = client
        .create_order(&BearerToken::new("stale"), &draft)
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(mock.orders_received().is_empty());
}
