//! Velora API - client library for the remote Velora REST API.
//!
//! # Architecture
//!
//! - The remote API is the source of truth - NO local sync, direct calls
//! - `reqwest` for HTTP, bearer-token authenticated
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//! - Cart state lives in [`cart::CartController`]: optimistic local
//!   mutation, rollback on failure, bounded-poll reconciliation after
//!   removals, and a typed broadcast so other views know to re-fetch
//!
//! # Example
//!
//! ```rust,ignore
//! use velora_api::{ApiClient, cart::{CartController, CartEvents}};
//!
//! let client = ApiClient::new(&config.api_base_url);
//! let events = CartEvents::new();
//!
//! // Browse the catalog (cached, no auth)
//! let products = client.products().await?;
//!
//! // Work with the signed-in shopper's cart
//! let mut cart = CartController::load(client.clone(), token, events).await?;
//! cart.set_quantity("68a1f00d", 2).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod cache;

pub mod auth;
pub mod cart;
pub mod client;
pub mod contact;
pub mod error;
pub mod orders;
pub mod payments;
pub mod products;
pub mod site;

pub use cart::{
    CartController, CartError, CartEvent, CartEvents, CartItem, LineState, QuantityOutcome,
    ReconcilePolicy, RemovalOutcome,
};
pub use client::ApiClient;
pub use error::ApiError;
