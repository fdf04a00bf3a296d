//! Session-stored types.
//!
//! Everything the storefront keeps per shopper lives in the session under
//! the keys below: the credential record from login, the email captured
//! during signup (so the OTP page can prefill it), and the order being paid
//! for between checkout and the payment gateway.

use serde::{Deserialize, Serialize};

use velora_api::orders::OrderLine;
use velora_core::{OrderId, Price};

/// An order that has been created but not yet paid.
///
/// Checkout creates the order, stashes this record, and redirects to the
/// payment page, which reads it back to initiate the gateway handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOrder {
    /// Id the API assigned at creation.
    pub order_id: OrderId,
    /// Email the payment receipt goes to.
    pub email: String,
    /// The ordered lines, for the payment page summary.
    pub items: Vec<OrderLine>,
    pub shipping_address: String,
    pub order_notes: String,
    /// Order total at the time of creation.
    pub total: Price,
}

/// Session keys for storefront data.
pub mod session_keys {
    /// Key for the signed-in shopper's credential record.
    pub const CREDENTIALS: &str = "credentials";

    /// Key for the email captured at registration, consumed by the OTP page.
    pub const SIGNUP_EMAIL: &str = "signup_email";

    /// Key for the order awaiting payment.
    pub const PENDING_ORDER: &str = "pending_order";
}
