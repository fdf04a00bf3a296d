//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in shopper in route handlers.
//! The credential record itself comes from the Velora API at login and is
//! stored in the session; presence of that record is what "signed in"
//! means.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use velora_api::auth::Credentials;

use crate::models::session_keys;

/// Extractor that requires a signed-in shopper.
///
/// If nobody is signed in, full-page requests are redirected to the login
/// page; HTMX fragment requests get a 401 with an `HX-Redirect` header so
/// the browser navigates there instead of swapping the fragment in.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(credentials): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", credentials.email)
/// }
/// ```
pub struct RequireAuth(pub Credentials);

/// Error returned when authentication is required but nobody is signed in.
pub enum AuthRejection {
    /// Redirect to login page (for full-page requests).
    RedirectToLogin,
    /// 401 with `HX-Redirect` (for HTMX fragment requests).
    FragmentToLogin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::FragmentToLogin => {
                (StatusCode::UNAUTHORIZED, [("HX-Redirect", "/auth/login")]).into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_htmx = parts.headers.contains_key("hx-request");
        let reject = || {
            if is_htmx {
                AuthRejection::FragmentToLogin
            } else {
                AuthRejection::RedirectToLogin
            }
        };

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts.extensions.get::<Session>().ok_or_else(reject)?;

        let credentials: Credentials = session
            .get(session_keys::CREDENTIALS)
            .await
            .ok()
            .flatten()
            .ok_or_else(reject)?;

        Ok(Self(credentials))
    }
}

/// Extractor that optionally gets the signed-in shopper.
///
/// Unlike `RequireAuth`, this does not reject the request when nobody is
/// signed in.
pub struct OptionalAuth(pub Option<Credentials>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let credentials = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<Credentials>(session_keys::CREDENTIALS)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(credentials))
    }
}

/// Helper to store the credential record in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_credentials(
    session: &Session,
    credentials: &Credentials,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::CREDENTIALS, credentials)
        .await
}

/// Helper to clear the credential record from the session (logout, or a 401
/// from the API telling us the token is dead).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_credentials(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Credentials>(session_keys::CREDENTIALS).await?;
    Ok(())
}

/// Where a shopper lands after their token stops working. The login page
/// turns the `expired` code into a human message.
const EXPIRED_LOGIN_URL: &str = "/auth/login?error=expired";

/// The full response to a 401 from the API: drop the stored credentials,
/// detach the Sentry user, and send the shopper to the login page. Fragment
/// requests get the `HX-Redirect` treatment so the whole window navigates.
pub async fn expire_session(session: &Session, headers: &HeaderMap) -> Response {
    if let Err(error) = clear_credentials(session).await {
        tracing::error!(%error, "Failed to clear credentials from session");
    }
    crate::error::clear_sentry_user();

    if headers.contains_key("hx-request") {
        (StatusCode::UNAUTHORIZED, [("HX-Redirect", EXPIRED_LOGIN_URL)]).into_response()
    } else {
        Redirect::to(EXPIRED_LOGIN_URL).into_response()
    }
}
