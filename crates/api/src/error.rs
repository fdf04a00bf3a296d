//! Error type for calls against the remote Velora API.
//!
//! The variants mirror how the binaries have to react, not the raw HTTP
//! status space: a 401 means "drop the stored credentials and send the user
//! to login", a 403 is an access-denied message with no state clearing, and
//! a 400-class response carries the server's own message verbatim so forms
//! can echo it inline.

use thiserror::Error;

/// Errors that can occur when interacting with the Velora API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (DNS, connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the bearer token (HTTP 401).
    ///
    /// Callers clear stored credentials and redirect to login. This is never
    /// retried through re-authentication.
    #[error("authentication required")]
    Unauthorized,

    /// The token is valid but lacks permission (HTTP 403).
    #[error("access denied: {0}")]
    Forbidden(String),

    /// The request was rejected as invalid (HTTP 400/409/422).
    ///
    /// Displays as-is: the message is the server's own wording.
    #[error("{0}")]
    Validation(String),

    /// Resource not found (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A response body failed to parse as JSON.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A response parsed as JSON but had none of the shapes this client
    /// understands.
    #[error("unexpected response shape: {0}")]
    UnexpectedPayload(String),
}

impl ApiError {
    /// Whether this error means the stored credentials are no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The API reports failures as `{"message": "..."}` (sometimes
/// `{"error": "..."}`). Anything else yields `None` and the caller falls
/// back to a generic message.
#[must_use]
pub fn extract_error_message(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_field() {
        let body = r#"{"message": "Invalid credentials"}"#;
        assert_eq!(
            extract_error_message(body).unwrap(),
            "Invalid credentials"
        );
    }

    #[test]
    fn extracts_error_field_as_fallback() {
        let body = r#"{"error": "Product out of stock"}"#;
        assert_eq!(
            extract_error_message(body).unwrap(),
            "Product out of stock"
        );
    }

    #[test]
    fn message_wins_over_error() {
        let body = r#"{"message": "first", "error": "second"}"#;
        assert_eq!(extract_error_message(body).unwrap(), "first");
    }

    #[test]
    fn non_json_bodies_yield_none() {
        assert_eq!(extract_error_message("<html>502</html>"), None);
        assert_eq!(extract_error_message(""), None);
    }

    #[test]
    fn blank_messages_yield_none() {
        assert_eq!(extract_error_message(r#"{"message": "  "}"#), None);
        assert_eq!(extract_error_message(r#"{"message": null}"#), None);
    }

    #[test]
    fn validation_error_displays_verbatim() {
        let err = ApiError::Validation("Quantity exceeds stock".to_string());
        assert_eq!(err.to_string(), "Quantity exceeds stock");
    }

    #[test]
    fn unauthorized_is_distinct() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::Forbidden("admins only".to_string()).is_unauthorized());
    }

    #[test]
    fn api_error_display() {
        let err = ApiError::Api {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - maintenance");
    }
}
