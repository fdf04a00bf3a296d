//! Velora Core - Shared types library.
//!
//! This crate provides common types used across all Velora components:
//! - `api` - Client library for the remote Velora REST API
//! - `storefront` - Public-facing storefront site
//! - `admin` - Internal administration console
//! - `cli` - Command-line tools for store operations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, tokens, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
