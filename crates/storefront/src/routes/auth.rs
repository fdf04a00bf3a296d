//! Authentication route handlers.
//!
//! Registration is a two-step flow: the API mails a one-time code and the
//! account starts working once `/auth/verify-otp` confirms it. Login
//! exchanges email and password for a bearer token that lives in the
//! session until logout or until the API answers a 401.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user, user_message};
use crate::filters;
use crate::middleware::{OptionalAuth, set_credentials};
use crate::models::session_keys;
use crate::state::AppState;

/// Minimum accepted password length, matching the API's own rule.
const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// OTP verification form data.
#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub email: String,
    pub otp: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data. The token rides along as a hidden field,
/// copied from the emailed link.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub password_confirm: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Query parameters for the reset page, filled by the emailed link.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// Map a redirect message code to banner text.
///
/// Handlers put either a known code or an urlencoded server message in the
/// query; anything that is not a known code is shown as-is.
fn banner_text(code: String) -> String {
    match code.as_str() {
        "expired" => "Your session has expired. Please sign in again.".to_string(),
        "credentials" => "Invalid email or password.".to_string(),
        "password_mismatch" => "The passwords don't match.".to_string(),
        "password_too_short" => "Passwords need at least 8 characters.".to_string(),
        "invalid_reset_link" => {
            "That reset link is missing its token. Request a new one.".to_string()
        }
        "session" => "We couldn't save your session. Please try again.".to_string(),
        "verified" => "Your email is verified. You can sign in now.".to_string(),
        "reset" => "Your password has been updated. Sign in with the new one.".to_string(),
        "email_sent" => {
            "If that address has an account, a reset link is on its way.".to_string()
        }
        _ => code,
    }
}

/// Build a redirect URL carrying a verbatim server message.
fn redirect_with_message(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{path}?error={}", urlencoding::encode(message))).into_response()
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub signed_in: bool,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub signed_in: bool,
}

/// OTP verification page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_otp.html")]
pub struct VerifyOtpTemplate {
    /// Prefilled from the email captured at registration, blank otherwise.
    pub email: String,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub signed_in: bool,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub token: String,
    pub error: Option<String>,
    pub signed_in: bool,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    Query(query): Query<MessageQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.map(banner_text),
        success: query.success.map(banner_text),
        signed_in: auth.is_some(),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.api().login(&form.email, &form.password).await {
        Ok(credentials) => {
            if let Err(error) = set_credentials(&session, &credentials).await {
                tracing::error!(%error, "Failed to store credentials in session");
                return Redirect::to("/auth/login?error=session").into_response();
            }

            set_sentry_user(&credentials.email);
            add_breadcrumb("auth", "login");
            Redirect::to("/").into_response()
        }
        Err(error) if error.is_unauthorized() => {
            // A 401 from the login endpoint means the password was wrong,
            // not that a session expired.
            tracing::warn!("Login rejected");
            Redirect::to("/auth/login?error=credentials").into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "Login failed");
            redirect_with_message("/auth/login", &user_message(&error))
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    Query(query): Query<MessageQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    RegisterTemplate {
        error: query.error.map(banner_text),
        signed_in: auth.is_some(),
    }
}

/// Handle registration form submission.
///
/// On success the API mails a one-time code and the shopper moves on to
/// the verification page, with their email stashed in the session so the
/// form comes prefilled.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register?error=password_mismatch").into_response();
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Redirect::to("/auth/register?error=password_too_short").into_response();
    }

    match state
        .api()
        .register(form.name.trim(), form.email.trim(), &form.password)
        .await
    {
        Ok(()) => {
            if let Err(error) = session
                .insert(session_keys::SIGNUP_EMAIL, form.email.trim())
                .await
            {
                tracing::error!(%error, "Failed to stash signup email in session");
            }
            Redirect::to("/auth/verify-otp").into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "Registration failed");
            redirect_with_message("/auth/register", &user_message(&error))
        }
    }
}

/// Display the OTP verification page.
pub async fn verify_otp_page(
    session: Session,
    Query(query): Query<MessageQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    let email = session
        .get::<String>(session_keys::SIGNUP_EMAIL)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    VerifyOtpTemplate {
        email,
        error: query.error.map(banner_text),
        signed_in: auth.is_some(),
    }
}

/// Handle OTP verification form submission.
pub async fn verify_otp(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<OtpForm>,
) -> Response {
    match state
        .api()
        .verify_otp(form.email.trim(), form.otp.trim())
        .await
    {
        Ok(()) => {
            if let Err(error) = session.remove::<String>(session_keys::SIGNUP_EMAIL).await {
                tracing::error!(%error, "Failed to drop signup email from session");
            }
            Redirect::to("/auth/login?success=verified").into_response()
        }
        Err(error) => {
            tracing::warn!(%error, "OTP verification failed");
            redirect_with_message("/auth/verify-otp", &user_message(&error))
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(
    Query(query): Query<MessageQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        error: query.error.map(banner_text),
        success: query.success.map(banner_text),
        signed_in: auth.is_some(),
    }
}

/// Handle forgot password form submission.
///
/// Always reports success so the form cannot be used to probe which
/// addresses have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    if let Err(error) = state.api().forgot_password(form.email.trim()).await {
        tracing::warn!(%error, "Password recovery request failed");
    }

    Redirect::to("/auth/forgot-password?success=email_sent").into_response()
}

/// Display the reset password page, reached from the emailed link.
pub async fn reset_password_page(
    Query(query): Query<ResetQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> Response {
    match query.token {
        Some(token) => ResetPasswordTemplate {
            token,
            error: query.error.map(banner_text),
            signed_in: auth.is_some(),
        }
        .into_response(),
        None => Redirect::to("/auth/forgot-password?error=invalid_reset_link").into_response(),
    }
}

/// Handle reset password form submission.
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let back = |code: &str| {
        Redirect::to(&format!(
            "/auth/reset-password?token={}&error={code}",
            urlencoding::encode(&form.token)
        ))
        .into_response()
    };

    if form.password != form.password_confirm {
        return back("password_mismatch");
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return back("password_too_short");
    }

    match state.api().reset_password(&form.token, &form.password).await {
        Ok(()) => Redirect::to("/auth/login?success=reset").into_response(),
        Err(error) => {
            tracing::warn!(%error, "Password reset failed");
            back(&urlencoding::encode(&user_message(&error)))
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Flushes the whole session, credentials, pending order and all, and
/// detaches the Sentry user.
pub async fn logout(session: Session) -> Response {
    add_breadcrumb("auth", "logout");
    if let Err(error) = session.flush().await {
        tracing::error!(%error, "Failed to flush session on logout");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_become_human_messages() {
        assert_eq!(banner_text("credentials".to_string()), "Invalid email or password.");
        assert!(banner_text("expired".to_string()).contains("expired"));
    }

    #[test]
    fn unknown_codes_pass_through_verbatim() {
        let message = "Email is already registered".to_string();
        assert_eq!(banner_text(message.clone()), message);
    }
}
