//! Newsletter subscription route handlers.
//!
//! The signup form lives in the footer and swaps itself out for a result
//! fragment via HTMX.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use velora_api::ApiError;

use crate::error::user_message;
use crate::state::AppState;

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

/// Success fragment template (replaces the form via HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_success.html")]
pub struct SubscribeSuccessTemplate {
    pub email: String,
}

/// Error fragment template (replaces the form via HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_error.html")]
pub struct SubscribeErrorTemplate {
    pub message: String,
    pub email: String,
}

/// Subscribe to the newsletter (HTMX).
///
/// An address that is already subscribed counts as success; the shopper
/// wanted to be on the list and they are.
#[instrument(skip(state), fields(email = %form.email))]
pub async fn subscribe(
    State(state): State<AppState>,
    Form(form): Form<SubscribeForm>,
) -> impl IntoResponse {
    let email = form.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        return SubscribeErrorTemplate {
            message: "Please enter a valid email address.".to_string(),
            email,
        }
        .into_response();
    }

    match state.api().subscribe_newsletter(&email).await {
        Ok(()) => {
            tracing::info!("Newsletter subscription successful");
            SubscribeSuccessTemplate { email }.into_response()
        }
        Err(ApiError::Validation(message))
            if message.to_lowercase().contains("already") =>
        {
            tracing::info!("Email already subscribed; treating as success");
            SubscribeSuccessTemplate { email }.into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "Newsletter subscription failed");
            SubscribeErrorTemplate {
                message: user_message(&error),
                email,
            }
            .into_response()
        }
    }
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    // Contains @, has content before and after it, and the domain has a dot
    let mut parts = email.splitn(2, '@');
    let Some(local) = parts.next() else {
        return false;
    };
    let Some(domain) = parts.next() else {
        return false;
    };
    !local.is_empty() && !domain.is_empty() && domain.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name@domain.co.uk"));
        assert!(is_valid_email("a@b.c"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("@"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@domain")); // no TLD
        assert!(!is_valid_email("test"));
    }
}
