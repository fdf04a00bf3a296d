//! Session-stored types.

use serde::{Deserialize, Serialize};

use velora_core::BearerToken;

/// The signed-in admin as stored in the session.
///
/// Only written after a login whose role check passed; a shopper token
/// never lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Bearer token for Velora API calls.
    pub token: BearerToken,
    /// Admin email, for display and Sentry context.
    pub email: String,
}

/// Session keys for admin data.
pub mod session_keys {
    /// Key for the signed-in admin record.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
