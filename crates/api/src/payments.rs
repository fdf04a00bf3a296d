//! Payment initiation.
//!
//! The API hands checkout off to a hosted gateway page; all we get back is
//! a redirect URL. Where exactly that URL sits in the response has changed
//! with gateway integrations, so extraction is lenient but the result is a
//! parsed [`Url`], never a raw string.

use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use velora_core::{BearerToken, OrderId};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitiateBody<'a> {
    email: &'a str,
    order_id: &'a OrderId,
}

#[derive(Deserialize)]
struct InitiatePayload {
    #[serde(
        default,
        alias = "redirectUrl",
        alias = "paymentUrl",
        alias = "authorization_url"
    )]
    url: Option<String>,
    #[serde(default)]
    data: Option<InitiateData>,
}

#[derive(Deserialize)]
struct InitiateData {
    #[serde(default, alias = "authorization_url")]
    url: Option<String>,
}

fn redirect_url(payload: InitiatePayload) -> Result<Url, ApiError> {
    let Some(raw) = payload
        .url
        .or_else(|| payload.data.and_then(|data| data.url))
    else {
        return Err(ApiError::UnexpectedPayload(
            "payment response carries no redirect URL".into(),
        ));
    };
    Url::parse(&raw).map_err(|_| {
        ApiError::UnexpectedPayload(format!("payment redirect is not a valid URL: {raw}"))
    })
}

impl ApiClient {
    /// Start a payment for an order and return the gateway page to send the
    /// shopper to.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the initiation or the response
    /// carries no usable redirect URL.
    #[instrument(skip(self, token), fields(order_id = %order_id))]
    pub async fn initiate_payment(
        &self,
        token: &BearerToken,
        email: &str,
        order_id: &OrderId,
    ) -> Result<Url, ApiError> {
        let payload: InitiatePayload = self
            .post_json(
                "/api/payments/initiate",
                Some(token),
                &InitiateBody { email, order_id },
            )
            .await?;
        redirect_url(payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn redirect_from_top_level_field() {
        let payload: InitiatePayload =
            serde_json::from_str(r#"{"url": "https://pay.example.com/p/123"}"#).unwrap();
        assert_eq!(
            redirect_url(payload).unwrap().as_str(),
            "https://pay.example.com/p/123"
        );
    }

    #[test]
    fn redirect_from_gateway_data_block() {
        let payload: InitiatePayload = serde_json::from_str(
            r#"{"data": {"authorization_url": "https://gateway.example.com/a/xyz"}}"#,
        )
        .unwrap();
        assert_eq!(
            redirect_url(payload).unwrap().as_str(),
            "https://gateway.example.com/a/xyz"
        );
    }

    #[test]
    fn redirect_from_aliased_field() {
        let payload: InitiatePayload =
            serde_json::from_str(r#"{"redirectUrl": "https://pay.example.com/r/9"}"#).unwrap();
        assert!(redirect_url(payload).is_ok());
    }

    #[test]
    fn missing_or_garbage_urls_are_rejected() {
        let payload: InitiatePayload = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(matches!(
            redirect_url(payload),
            Err(ApiError::UnexpectedPayload(_))
        ));

        let payload: InitiatePayload =
            serde_json::from_str(r#"{"url": "not a url"}"#).unwrap();
        assert!(matches!(
            redirect_url(payload),
            Err(ApiError::UnexpectedPayload(_))
        ));
    }
}
