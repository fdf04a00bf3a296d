//! Bearer token credential type.
//!
//! The remote API issues opaque bearer tokens at login. The token is the only
//! credential this codebase ever holds, and it must never end up in logs, so
//! the wrapper redacts itself in `Debug` output. Code that genuinely needs
//! the raw value (the `Authorization` header, session storage) goes through
//! [`BearerToken::as_str`].

use serde::{Deserialize, Serialize};

/// An opaque bearer token issued by the remote API.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value, for building an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_token() {
        let token = BearerToken::new("very-secret-value");
        let debug = format!("{token:?}");
        assert!(!debug.contains("very-secret-value"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn serde_is_transparent() {
        let token = BearerToken::new("abc123");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc123\"");
        let back: BearerToken = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(back.as_str(), "abc123");
    }
}
