//! Rendered storefront pages against the mock API, checked for the markup
//! the browser-side behaviour hangs off.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

use velora_integration_tests::{MockApi, PASSWORD};
use velora_storefront::{app, config::StorefrontConfig, state::AppState};

fn storefront(mock: &MockApi) -> Router {
    let config = StorefrontConfig {
        api_base_url: mock.base_url().clone(),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
    };
    app(AppState::new(config))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Sign in through the login form and hand back the session cookie pair.
async fn sign_in(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "email=shopper%40velora.test&password={PASSWORD}"
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .unwrap()
}

#[tokio::test]
async fn home_page_renders_the_catalog() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Dew Serum"));
    assert!(body.contains("Gentle Cleanser"));
    assert!(body.contains("visits and counting"));
}

#[tokio::test]
async fn product_detail_renders_for_a_known_id() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app.oneshot(get("/products/p1")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Dew Serum"));
}

#[tokio::test]
async fn unknown_product_is_a_404() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app.oneshot(get("/products/no-such-id")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_cart_page_has_no_mutation_forms() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);
    let cookie = sign_in(&app).await;

    let response = app.oneshot(get_with_cookie("/cart", &cookie)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Your cart is empty"));
    // Nothing on the page can post a quantity change or a removal.
    assert!(!body.contains("/cart/update"));
    assert!(!body.contains("btn-remove"));
    assert!(!body.contains("/cart/clear"));
}

#[tokio::test]
async fn cart_with_lines_renders_quantity_and_remove_controls() {
    let mock = MockApi::start().await.unwrap();
    mock.seed_cart(&json!([
        {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": 28, "quantity": 2}
    ]));
    let app = storefront(&mock);
    let cookie = sign_in(&app).await;

    let response = app.oneshot(get_with_cookie("/cart", &cookie)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Dew Serum"));
    assert!(body.contains("/cart/update"));
    assert!(body.contains("name=\"identity\""));
    assert!(body.contains("btn-remove"));
}

#[tokio::test]
async fn display_only_lines_render_without_controls() {
    let mock = MockApi::start().await.unwrap();
    mock.seed_cart(&json!([
        {"_id": "line9", "name": "Sample Sachet", "price": 0, "quantity": 1}
    ]));
    let app = storefront(&mock);
    let cookie = sign_in(&app).await;

    let response = app.oneshot(get_with_cookie("/cart", &cookie)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    // The line shows, but with no way to change or remove it.
    assert!(body.contains("Sample Sachet"));
    assert!(!body.contains("/cart/update"));
    assert!(!body.contains("btn-remove"));
}
