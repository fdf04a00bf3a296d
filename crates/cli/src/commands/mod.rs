//! Command implementations and the plumbing they share.

pub mod orders;
pub mod products;
pub mod site;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use velora_api::{ApiClient, ApiError};
use velora_core::BearerToken;

/// Errors that can stop a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// `VELORA_API_BASE_URL` did not parse as a URL.
    #[error("Invalid VELORA_API_BASE_URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    /// The remote API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Build an API client from `VELORA_API_BASE_URL`.
pub fn client() -> Result<ApiClient, CliError> {
    dotenvy::dotenv().ok();

    let raw = std::env::var("VELORA_API_BASE_URL")
        .map_err(|_| CliError::MissingEnvVar("VELORA_API_BASE_URL"))?;
    let base_url = Url::parse(&raw)?;
    Ok(ApiClient::new(&base_url))
}

/// Read the admin bearer token from `VELORA_ADMIN_TOKEN`.
///
/// The value sits in a [`SecretString`] until the moment it is wrapped, so a
/// stray debug print of the environment lookup cannot leak it.
pub fn admin_token() -> Result<BearerToken, CliError> {
    let secret: SecretString = std::env::var("VELORA_ADMIN_TOKEN")
        .map_err(|_| CliError::MissingEnvVar("VELORA_ADMIN_TOKEN"))?
        .into();
    Ok(BearerToken::new(secret.expose_secret()))
}
