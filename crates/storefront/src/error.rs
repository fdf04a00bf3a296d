//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client, plus the shared mapping from API failures to
//! the messages shoppers actually see.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use velora_api::orders::CheckoutError;
use velora_api::{ApiError, CartError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Velora API operation failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Cart mutation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order assembly or submission failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The message a shopper sees for a given API failure.
///
/// Validation failures surface the server's own message verbatim; transport
/// and decode failures collapse to a generic apology so internals never
/// leak.
#[must_use]
pub fn user_message(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
        ApiError::Forbidden(message) | ApiError::Validation(message) => message.clone(),
        ApiError::NotFound(message) => message.clone(),
        ApiError::Http(_) => "We couldn't reach the store. Please try again.".to_string(),
        ApiError::Api { .. } | ApiError::Decode(_) | ApiError::UnexpectedPayload(_) => {
            "Something went wrong on our side. Please try again.".to_string()
        }
    }
}

/// The message a shopper sees for a failed cart mutation.
#[must_use]
pub fn cart_user_message(error: &CartError) -> String {
    match error {
        CartError::Api(api) => user_message(api),
        CartError::UnknownLine(_) => "That item is no longer in your cart.".to_string(),
        CartError::MissingProductId(_) => "That item can't be changed.".to_string(),
    }
}

impl AppError {
    /// Whether this error is our fault rather than the client's, and so
    /// worth a Sentry event.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Session(_) | Self::Internal(_) => true,
            Self::Api(api) | Self::Cart(CartError::Api(api)) | Self::Checkout(CheckoutError::Api(api)) => {
                matches!(
                    api,
                    ApiError::Http(_)
                        | ApiError::Api { .. }
                        | ApiError::Decode(_)
                        | ApiError::UnexpectedPayload(_)
                )
            }
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Api(api) | Self::Cart(CartError::Api(api)) | Self::Checkout(CheckoutError::Api(api)) => {
                match api {
                    ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
                    ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
                    ApiError::Validation(_) => StatusCode::BAD_REQUEST,
                    ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                    ApiError::Http(_)
                    | ApiError::Api { .. }
                    | ApiError::Decode(_)
                    | ApiError::UnexpectedPayload(_) => StatusCode::BAD_GATEWAY,
                }
            }
            Self::Cart(_) | Self::Checkout(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Api(api) => user_message(api),
            Self::Cart(cart) => cart_user_message(cart),
            Self::Checkout(CheckoutError::Api(api)) => user_message(api),
            Self::Checkout(CheckoutError::NoOrderableLines) => {
                "None of the items in your cart can be ordered.".to_string()
            }
            Self::NotFound(message) | Self::BadRequest(message) => message.clone(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an email.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str) {
    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::Api(ApiError::Unauthorized)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Forbidden("no".into()))),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Api(ApiError::Validation("bad".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_messages_surface_verbatim() {
        let message = user_message(&ApiError::Validation(
            "Quantity exceeds available stock".to_string(),
        ));
        assert_eq!(message, "Quantity exceeds available stock");
    }

    #[test]
    fn transport_failures_stay_generic() {
        let message = user_message(&ApiError::UnexpectedPayload("weird".to_string()));
        assert!(!message.contains("weird"));
    }
}
