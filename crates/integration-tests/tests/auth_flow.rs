//! Login and session expiry, from the API client up through the storefront
//! router.
//!
//! The storefront is driven in-process with `oneshot`; clones of the router
//! share one session store, so a cookie captured from the login response
//! authenticates later requests.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header};
use tower::ServiceExt;

use velora_core::UserRole;
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

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
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

/// The session cookie pair from a response, without its attributes.
fn session_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
        .unwrap()
}

fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn client_login_maps_roles_from_the_response() {
    let mock = MockApi::start().await.unwrap();
    let client = mock.client();

    let shopper = client
        .login("shopper@velora.test", PASSWORD)
        .await
        .unwrap();
    assert_eq!(shopper.role, UserRole::User);
    assert_eq!(shopper.email, "shopper@velora.test");
    assert!(!shopper.is_admin());

    let admin = client.login("admin@velora.test", PASSWORD).await.unwrap();
    assert!(admin.is_admin());
}

#[tokio::test]
async fn client_login_rejection_is_unauthorized() {
    let mock = MockApi::start().await.unwrap();
    let err = mock
        .client()
        .login("shopper@velora.test", "wrong")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn login_stores_a_session_and_redirects_home() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app
        .clone()
        .oneshot(form_post(
            "/auth/login",
            &format!("email=shopper%40velora.test&password={PASSWORD}"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response);

    // The cookie authenticates a page that needs the profile endpoint.
    let response = app
        .oneshot(get_with_cookie("/account", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("shopper@velora.test"));
}

#[tokio::test]
async fn wrong_password_bounces_back_to_the_login_form() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app
        .oneshot(form_post(
            "/auth/login",
            "email=shopper%40velora.test&password=wrong",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?error=credentials");
}

#[tokio::test]
async fn signed_out_cart_redirects_to_login() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app.oneshot(get("/cart")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn revoked_token_expires_the_session_and_redirects() {
    let mock = MockApi::start().await.unwrap();
    let app = storefront(&mock);

    let response = app
        .clone()
        .oneshot(form_post(
            "/auth/login",
            &format!("email=shopper%40velora.test&password={PASSWORD}"),
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    // The API invalidates the token behind the storefront's back.
    mock.revoke_tokens();

    let response = app
        .clone()
        .oneshot(get_with_cookie("/cart", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?error=expired");

    // The stored credentials are gone: the same cookie now fails the auth
    // gate before any API call is made.
    let response = app
        .oneshot(get_with_cookie("/cart", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");
}
