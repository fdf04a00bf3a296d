//! HTTP transport for the Velora REST API.
//!
//! [`ApiClient`] owns the `reqwest` client, the configured base URL, and the
//! catalog cache. Endpoint wrappers live next to their types in the sibling
//! modules (`products`, `orders`, `auth`, ...) as further `impl ApiClient`
//! blocks; everything funnels through the request plumbing here so status
//! classification and error-body mining happen in exactly one place.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use velora_core::BearerToken;

use crate::cache::CacheValue;
use crate::error::{ApiError, extract_error_message};

/// How long catalog reads stay cached.
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Upper bound on cached catalog entries.
const CACHE_CAPACITY: u64 = 1000;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Velora REST API.
///
/// Cheap to clone; all clones share one connection pool and one catalog
/// cache. Catalog reads are cached for 5 minutes, cart and order state never
/// is.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client for the given base URL.
    #[must_use]
    pub fn new(base_url: &Url) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
                cache,
            }),
        }
    }

    /// The base URL this client talks to, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn cache(&self) -> &Cache<String, CacheValue> {
        &self.inner.cache
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Build a request for `path` (e.g. `/api/products`), attaching the
    /// bearer token when one is given.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&BearerToken>,
    ) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token.as_str()),
            None => builder,
        }
    }

    /// Send a request and classify the response status.
    ///
    /// Success passes the response through for body decoding. Failure mines
    /// the body for the server's own message and maps the status onto the
    /// [`ApiError`] taxonomy.
    pub(crate) async fn execute(
        &self,
        builder: RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden(
                message.unwrap_or_else(|| "access denied".to_string()),
            )),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(
                message.unwrap_or_else(|| "resource not found".to_string()),
            )),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(ApiError::Validation(
                    message.unwrap_or_else(|| "the request was rejected".to_string()),
                ))
            }
            _ => {
                tracing::error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "API returned non-success status"
                );
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message: message
                        .unwrap_or_else(|| body.chars().take(200).collect::<String>()),
                })
            }
        }
    }

    /// GET `path` and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&BearerToken>,
    ) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path, token)).await?;
        decode_json(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response.
    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&BearerToken>,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(self.request(Method::POST, path, token).json(body))
            .await?;
        decode_json(response).await
    }

    /// POST a JSON body to `path`, discarding the response body.
    pub(crate) async fn post_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&BearerToken>,
        body: &B,
    ) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, path, token).json(body))
            .await?;
        Ok(())
    }

    /// PUT a JSON body to `path`, discarding the response body.
    pub(crate) async fn put_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&BearerToken>,
        body: &B,
    ) -> Result<(), ApiError> {
        self.execute(self.request(Method::PUT, path, token).json(body))
            .await?;
        Ok(())
    }

    /// DELETE `path`, with an optional JSON body, discarding the response.
    pub(crate) async fn delete_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&BearerToken>,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut builder = self.request(Method::DELETE, path, token);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await?;
        Ok(())
    }

    /// GET `path` and return the raw body text.
    ///
    /// Used by the cart fetch, which has to parse the body itself because the
    /// payload shape varies.
    pub(crate) async fn get_text(
        &self,
        path: &str,
        token: Option<&BearerToken>,
    ) -> Result<String, ApiError> {
        let response = self.execute(self.request(Method::GET, path, token)).await?;
        Ok(response.text().await?)
    }
}

/// Decode a response body as JSON, logging a snippet on failure.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse API response"
        );
        ApiError::Decode(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let url = Url::parse("http://api.velora.test:5000/").unwrap();
        ApiClient::new(&url)
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        assert_eq!(client().base_url(), "http://api.velora.test:5000");
    }

    #[test]
    fn clones_share_the_same_inner() {
        let a = client();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }
}
