//! End-to-end reconciliation behaviour of [`CartController`] over real HTTP.
//!
//! The mock scripts the two consistency failures the controller exists to
//! absorb: quantity updates the server rejects, and removals that reads do
//! not reflect yet. Polling runs under the zero-delay policy so these tests
//! finish in milliseconds.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use velora_api::{
    ApiError, CartController, CartError, CartEvents, LineState, QuantityOutcome, ReconcilePolicy,
    RemovalOutcome,
};
use velora_integration_tests::MockApi;

async fn seeded_controller(mock: &MockApi, events: CartEvents) -> CartController {
    mock.seed_cart(&json!([
        {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 10, "quantity": 2}
    ]));
    let controller = CartController::load_with_policy(
        mock.client(),
        MockApi::shopper_token(),
        events,
        ReconcilePolicy::immediate(),
    )
    .await
    .unwrap();
    mock.reset_counters();
    controller
}

#[tokio::test]
async fn quantity_update_overwrites_with_the_authoritative_list() {
    let mock = MockApi::start().await.unwrap();
    let events = CartEvents::new();
    let mut changes = events.subscribe();
    let mut cart = seeded_controller(&mock, events).await;

    let outcome = cart.set_quantity("p1", 3).await.unwrap();

    assert_eq!(outcome, QuantityOutcome::Updated);
    assert_eq!(cart.items()[0].quantity, 3);
    assert_eq!(cart.subtotal().to_string(), "30.00");
    assert_eq!(cart.line_state("p1"), LineState::Committed);
    assert!(changes.try_recv().is_ok());

    // The server applied it too; this was not a local-only edit.
    assert_eq!(mock.server_cart()[0]["quantity"], json!(3));
    assert_eq!(mock.quantity_updates(), 1);
}

#[tokio::test]
async fn failed_update_rolls_back_to_the_exact_snapshot() {
    let mock = MockApi::start().await.unwrap();
    let events = CartEvents::new();
    let mut changes = events.subscribe();
    let mut cart = seeded_controller(&mock, events).await;
    let before = cart.items().to_vec();

    mock.fail_quantity_updates("Quantity exceeds stock");
    let err = cart.set_quantity("p1", 50).await.unwrap_err();

    match err {
        CartError::Api(ApiError::Validation(message)) => {
            assert_eq!(message, "Quantity exceeds stock");
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(cart.items(), before.as_slice());
    assert_eq!(cart.line_state("p1"), LineState::RolledBack);
    assert_eq!(changes.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(mock.server_cart()[0]["quantity"], json!(2));
}

#[tokio::test]
async fn rejected_quantity_never_reaches_the_network() {
    let mock = MockApi::start().await.unwrap();
    let mut cart = seeded_controller(&mock, CartEvents::new()).await;
    let before = cart.items().to_vec();

    assert_eq!(cart.set_quantity("p1", 0).await.unwrap(), QuantityOutcome::Rejected);
    assert_eq!(cart.set_quantity("p1", -7).await.unwrap(), QuantityOutcome::Rejected);

    assert_eq!(cart.items(), before.as_slice());
    assert_eq!(mock.quantity_updates(), 0);
    assert_eq!(mock.cart_fetches(), 0);
}

#[tokio::test]
async fn removal_converges_on_the_third_poll() {
    let mock = MockApi::start().await.unwrap();
    let events = CartEvents::new();
    let mut changes = events.subscribe();
    let mut cart = seeded_controller(&mock, events).await;

    // Reads keep serving the line for two fetches after the removal.
    mock.set_removal_lag(2);
    let outcome = cart.remove_item("p1").await.unwrap();

    assert_eq!(outcome, RemovalOutcome::Confirmed { polls: 3 });
    assert!(cart.is_empty());
    assert_eq!(cart.line_state("p1"), LineState::Idle);
    assert_eq!(mock.removals(), 1);
    assert_eq!(mock.cart_fetches(), 3);
    assert!(changes.try_recv().is_ok());
}

#[tokio::test]
async fn removal_visible_immediately_takes_one_poll() {
    let mock = MockApi::start().await.unwrap();
    let mut cart = seeded_controller(&mock, CartEvents::new()).await;

    mock.set_removal_lag(0);
    let outcome = cart.remove_item("p1").await.unwrap();

    assert_eq!(outcome, RemovalOutcome::Confirmed { polls: 1 });
    assert_eq!(mock.cart_fetches(), 1);
}

#[tokio::test]
async fn removal_that_never_converges_is_forced_out_locally() {
    let mock = MockApi::start().await.unwrap();
    let events = CartEvents::new();
    let mut changes = events.subscribe();
    let mut cart = seeded_controller(&mock, events).await;

    mock.set_removal_lag(u32::MAX);
    let outcome = cart.remove_item("p1").await.unwrap();

    assert_eq!(outcome, RemovalOutcome::Forced);
    assert!(cart.is_empty());
    // Exactly the poll budget, then the controller stopped asking.
    assert_eq!(mock.cart_fetches(), 3);
    // Local and server state diverge by design: the server still has it.
    assert!(!mock.server_cart().is_empty());
    assert!(changes.try_recv().is_ok());
}

#[tokio::test]
async fn rejected_removal_call_leaves_the_line_in_place() {
    let mock = MockApi::start().await.unwrap();
    let mut cart = seeded_controller(&mock, CartEvents::new()).await;

    let err = cart
        .remove_item("no-such-line")
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::UnknownLine(_)));
    assert_eq!(cart.items().len(), 1);
    assert_eq!(mock.removals(), 0);
}
