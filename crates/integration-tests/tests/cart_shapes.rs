//! The three cart payload shapes, driven through the real HTTP client.
//!
//! Shape normalization has unit coverage next to the parser; these tests
//! prove the full fetch path treats all three server framings identically
//! and refuses anything else.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;

use velora_api::ApiError;
use velora_integration_tests::{CartShape, MockApi};

#[tokio::test]
async fn all_three_shapes_normalize_identically() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.seed_cart(&json!([
        {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 28, "quantity": 2},
        {"_id": "line2", "name": "Sample Sachet", "price": 0, "quantity": 1}
    ]));

    let mut normalized = Vec::new();
    for shape in [CartShape::Bare, CartShape::Items, CartShape::Nested] {
        mock.set_cart_shape(shape);
        normalized.push(client.fetch_cart_items(&token).await.unwrap());
    }

    assert_eq!(normalized[0], normalized[1]);
    assert_eq!(normalized[1], normalized[2]);

    let items = &normalized[0];
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product_id.as_ref().unwrap().as_str(), "p1");
    assert_eq!(items[0].quantity, 2);
    // The second record has an id of its own but no product id: display-only.
    assert!(items[1].product_id.is_none());
    assert_eq!(items[1].line_id.as_str(), "line2");
}

#[tokio::test]
async fn unknown_shape_is_an_error_not_an_empty_cart() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.override_cart_body(r#"{"lines": [{"productId": "p1"}]}"#);
    let err = client.fetch_cart_items(&token).await.unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedPayload(_)));
}

#[tokio::test]
async fn non_json_body_is_a_decode_error() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();
    let token = MockApi::shopper_token();

    mock.override_cart_body("<html>Bad gateway</html>");
    let err = client.fetch_cart_items(&token).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn cart_fetch_without_a_valid_token_is_unauthorized() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();

    let err = client
        .fetch_cart_items(&velora_core::BearerToken::new("stale"))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}
