//! Error messages and Sentry context for the admin console.
//!
//! Admin handlers render failures into page banners rather than error
//! responses, so this module carries the message mapping and the Sentry
//! helpers instead of an `IntoResponse` error type.

use velora_api::ApiError;

/// The banner message an admin sees for a given API failure.
///
/// Access denials and validation failures surface the server's own message;
/// transport and decode failures collapse to a generic line.
#[must_use]
pub fn user_message(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
        ApiError::Forbidden(message) | ApiError::Validation(message) => message.clone(),
        ApiError::NotFound(message) => message.clone(),
        ApiError::Http(_) => "The API is unreachable. Check that it is running.".to_string(),
        ApiError::Api { .. } | ApiError::Decode(_) | ApiError::UnexpectedPayload(_) => {
            "The API returned something unexpected. Try again.".to_string()
        }
    }
}

/// Set the Sentry user context from an admin email.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denials_surface_the_server_message() {
        let message = user_message(&ApiError::Forbidden("Admin access required".to_string()));
        assert_eq!(message, "Admin access required");
    }

    #[test]
    fn transport_failures_stay_generic() {
        let message = user_message(&ApiError::UnexpectedPayload("weird body".to_string()));
        assert!(!message.contains("weird body"));
    }
}
