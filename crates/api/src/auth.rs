//! Account endpoints and the credential record both binaries keep in
//! session state.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use velora_core::{BearerToken, UserRole};

use crate::client::ApiClient;
use crate::error::ApiError;

/// What a signed-in session stores: the bearer token plus the identity the
/// API reported at login. Presence of this record is what "signed in"
/// means; there is no separate flag to drift out of sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub token: BearerToken,
    pub role: UserRole,
    pub email: String,
}

impl Credentials {
    /// Whether this session may use the admin console.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// The signed-in account as reported by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfilePayload {
    Bare(Profile),
    Wrapped { user: Profile },
}

impl ProfilePayload {
    fn into_profile(self) -> Profile {
        let (Self::Bare(user) | Self::Wrapped { user }) = self;
        user
    }
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct OtpBody<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    password: &'a str,
}

/// Login response, decoded leniently. The token normally arrives at the
/// top level with the identity nested under `user`, but both have moved
/// between API revisions.
#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "accessToken")]
    token: Option<BearerToken>,
    user: Option<LoginUser>,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct LoginUser {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<UserRole>,
}

fn credentials_from_login(
    response: LoginResponse,
    submitted_email: &str,
) -> Result<Credentials, ApiError> {
    let Some(token) = response.token else {
        return Err(ApiError::UnexpectedPayload(
            "login response carries no token".into(),
        ));
    };
    let (user_email, user_role) = response
        .user
        .map_or((None, None), |user| (user.email, user.role));
    Ok(Credentials {
        token,
        role: user_role.or(response.role).unwrap_or_default(),
        email: user_email
            .or(response.email)
            .unwrap_or_else(|| submitted_email.to_string()),
    })
}

impl ApiClient {
    /// Create an account. The API mails a one-time code which
    /// [`Self::verify_otp`] must confirm before login works.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the registration.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        self.post_ack(
            "/api/auth/register",
            None,
            &RegisterBody {
                name,
                email,
                password,
            },
        )
        .await
    }

    /// Confirm the one-time code mailed at registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is wrong or expired.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<(), ApiError> {
        self.post_ack("/api/auth/verify-otp", None, &OtpBody { email, otp })
            .await
    }

    /// Exchange email and password for a credential record.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the login or the response
    /// carries no token.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials, ApiError> {
        let response: LoginResponse = self
            .post_json("/api/auth/login", None, &LoginBody { email, password })
            .await?;
        credentials_from_login(response, email)
    }

    /// Ask the API to mail a password reset link.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the request.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        self.post_ack("/api/auth/forgot-password", None, &EmailBody { email })
            .await
    }

    /// Set a new password using the token from a reset link. The token
    /// travels as a query parameter, not in the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired.
    #[instrument(skip(self, reset_token, password))]
    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, "/api/auth/reset-password", None)
            .query(&[("token", reset_token)])
            .json(&PasswordBody { password });
        self.execute(request).await?;
        Ok(())
    }

    /// Fetch the signed-in account's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self, token))]
    pub async fn profile(&self, token: &BearerToken) -> Result<Profile, ApiError> {
        let payload: ProfilePayload = self.get_json("/api/auth/profile", Some(token)).await?;
        Ok(payload.into_profile())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn login_decodes_the_documented_shape() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"token": "tok-1", "user": {"email": "ana@example.com", "role": "admin"}}"#,
        )
        .unwrap();
        let creds = credentials_from_login(response, "submitted@example.com").unwrap();

        assert_eq!(creds.token.as_str(), "tok-1");
        assert_eq!(creds.role, UserRole::Admin);
        assert_eq!(creds.email, "ana@example.com");
        assert!(creds.is_admin());
    }

    #[test]
    fn login_falls_back_to_the_submitted_email_and_user_role() {
        let response: LoginResponse = serde_json::from_str(r#"{"token": "tok-2"}"#).unwrap();
        let creds = credentials_from_login(response, "ana@example.com").unwrap();

        assert_eq!(creds.email, "ana@example.com");
        assert_eq!(creds.role, UserRole::User);
        assert!(!creds.is_admin());
    }

    #[test]
    fn login_accepts_flat_and_aliased_fields() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"accessToken": "tok-3", "email": "flat@example.com", "role": "admin"}"#,
        )
        .unwrap();
        let creds = credentials_from_login(response, "other@example.com").unwrap();

        assert_eq!(creds.token.as_str(), "tok-3");
        assert_eq!(creds.email, "flat@example.com");
        assert_eq!(creds.role, UserRole::Admin);
    }

    #[test]
    fn login_without_a_token_is_rejected() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"user": {"email": "ana@example.com"}}"#).unwrap();
        let err = credentials_from_login(response, "ana@example.com").unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload(_)));
    }

    #[test]
    fn profile_decodes_bare_and_wrapped() {
        let bare: ProfilePayload =
            serde_json::from_str(r#"{"email": "ana@example.com", "role": "user"}"#).unwrap();
        assert_eq!(bare.into_profile().email, "ana@example.com");

        let wrapped: ProfilePayload = serde_json::from_str(
            r#"{"user": {"name": "Ana", "email": "ana@example.com", "role": "admin"}}"#,
        )
        .unwrap();
        let profile = wrapped.into_profile();
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(profile.role, UserRole::Admin);
    }
}
