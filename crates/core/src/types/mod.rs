//! Core types for Velora.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod id;
pub mod price;
pub mod status;

pub use credential::BearerToken;
pub use id::*;
pub use price::{Price, PriceError};
pub use status::*;
