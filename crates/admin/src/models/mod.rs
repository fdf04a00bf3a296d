//! Domain models for the admin console.

pub mod session;

pub use session::{CurrentAdmin, session_keys};
