//! Authentication route handlers for the admin console.
//!
//! Same credentials endpoint as the storefront, but the role on the
//! returned record is checked here: only `UserRole::Admin` gets a session.
//! A shopper account sees access denied and nothing is stored.

use askama::Template;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use velora_core::UserRole;

use crate::error::{clear_sentry_user, set_sentry_user, user_message};
use crate::middleware::{clear_current_admin, set_current_admin};
use crate::models::CurrentAdmin;
use crate::routes::render;
use crate::state::AppState;

/// Login form fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Query parameters carrying a banner code.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

/// Map a banner code from the query string to display text.
///
/// Unknown codes pass through verbatim; that is how API messages carried
/// over a redirect reach the page.
fn banner_text(code: &str) -> String {
    match code {
        "expired" => "Your session has expired. Please sign in again.".to_string(),
        "credentials" => "Invalid email or password.".to_string(),
        "denied" => "This account does not have admin access.".to_string(),
        "session" => "We couldn't save your session. Please try again.".to_string(),
        other => other.to_string(),
    }
}

/// Redirect to the login page with a verbatim message as the banner code.
fn login_with_message(message: &str) -> Response {
    Redirect::to(&format!(
        "/auth/login?error={}",
        urlencoding::encode(message)
    ))
    .into_response()
}

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    error: Option<String>,
}

/// Render the login page.
///
/// GET /auth/login
pub async fn login_page(Query(query): Query<MessageQuery>) -> Response {
    let template = LoginTemplate {
        error: query.error.as_deref().map(banner_text),
    };
    render(&template).into_response()
}

/// Handle the login form.
///
/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    axum::Form(form): axum::Form<LoginForm>,
) -> Response {
    let credentials = match state.api().login(&form.email, &form.password).await {
        Ok(credentials) => credentials,
        Err(error) if error.is_unauthorized() => {
            // A 401 here means the password was wrong, not an expired session.
            return Redirect::to("/auth/login?error=credentials").into_response();
        }
        Err(error) => {
            tracing::error!(%error, "Admin login failed");
            return login_with_message(&user_message(&error));
        }
    };

    if credentials.role != UserRole::Admin {
        tracing::warn!(email = %form.email, "Non-admin login attempt on admin console");
        return Redirect::to("/auth/login?error=denied").into_response();
    }

    let admin = CurrentAdmin {
        token: credentials.token,
        email: credentials.email,
    };
    if let Err(error) = set_current_admin(&session, &admin).await {
        tracing::error!(%error, "Failed to store admin session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    set_sentry_user(&admin.email);
    tracing::info!(email = %admin.email, "Admin signed in");
    Redirect::to("/").into_response()
}

/// Logout and clear the session.
///
/// POST /auth/logout
pub async fn logout(session: Session) -> Response {
    if let Err(error) = clear_current_admin(&session).await {
        tracing::error!(%error, "Failed to clear admin session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_banner_codes_map_to_copy() {
        assert_eq!(banner_text("denied"), "This account does not have admin access.");
        assert_eq!(banner_text("credentials"), "Invalid email or password.");
    }

    #[test]
    fn unknown_banner_codes_pass_through() {
        assert_eq!(banner_text("Rate limited, slow down"), "Rate limited, slow down");
    }
}
