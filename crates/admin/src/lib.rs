//! Velora Admin library.
//!
//! This crate provides the admin console functionality as a library,
//! allowing it to be tested and reused.
//!
//! The console manages the live catalog, order lifecycle, and contact
//! inbox through the same remote API the storefront uses, with a
//! higher-privilege token. Deploy it behind the VPN; it has no audience
//! outside the back office.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use axum::Router;

use state::AppState;

/// Build the admin application: all routes plus the session layer.
#[must_use]
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}
