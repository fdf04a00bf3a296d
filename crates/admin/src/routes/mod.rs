//! HTTP route handlers for the admin console.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Dashboard (catalog size, recent orders)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action (admins only)
//! POST /auth/logout            - Logout action
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /products/new           - Create form
//! POST /products               - Create (multipart, optional image)
//! GET  /products/{id}/edit     - Edit form
//! POST /products/{id}          - Update (multipart, optional image)
//! POST /products/{id}/delete   - Delete
//!
//! # Orders
//! GET  /orders                 - Order listing with status dropdowns
//! POST /orders/{id}/status     - Move an order to a new status
//!
//! # Contact messages
//! GET  /messages               - Inbox
//! POST /messages/{id}/reply    - Reply (the API mails the sender)
//! POST /messages/{id}/delete   - Delete
//! ```

pub mod auth;
pub mod dashboard;
pub mod messages;
pub mod orders;
pub mod products;

use askama::Template;
use axum::{
    Router,
    response::Html,
    routing::{get, post},
};

use crate::state::AppState;

/// Render a template into `Html`, with a logged fallback if rendering fails.
pub(crate) fn render<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {e}");
        "Internal Server Error".to_string()
    }))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new_form))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit_form))
        .route("/{id}/delete", post(products::delete))
}

/// Create all routes for the admin console.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .nest("/products", product_routes())
        .route("/orders", get(orders::index))
        .route("/orders/{id}/status", post(orders::set_status))
        .route("/messages", get(messages::index))
        .route("/messages/{id}/reply", post(messages::reply))
        .route("/messages/{id}/delete", post(messages::delete))
}
