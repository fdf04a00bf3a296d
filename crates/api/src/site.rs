//! Site-wide odds and ends: the visit counter and newsletter signup.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(untagged)]
enum ViewsPayload {
    Bare(u64),
    Wrapped {
        #[serde(alias = "views")]
        count: u64,
    },
}

impl ViewsPayload {
    const fn into_count(self) -> u64 {
        let (Self::Bare(count) | Self::Wrapped { count }) = self;
        count
    }
}

#[derive(Serialize)]
struct SubscribeBody<'a> {
    email: &'a str,
}

impl ApiClient {
    /// Total recorded page views. The endpoint counts the lookup itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self))]
    pub async fn page_views(&self) -> Result<u64, ApiError> {
        let payload: ViewsPayload = self.get_json("/api/views/count", None).await?;
        Ok(payload.into_count())
    }

    /// Subscribe an address to the newsletter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the address.
    #[instrument(skip(self))]
    pub async fn subscribe_newsletter(&self, email: &str) -> Result<(), ApiError> {
        self.post_ack("/api/newsletter/subscribe", None, &SubscribeBody { email })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn view_counts_decode_all_shapes() {
        let bare: ViewsPayload = serde_json::from_str("12045").unwrap();
        assert_eq!(bare.into_count(), 12045);

        let wrapped: ViewsPayload = serde_json::from_str(r#"{"count": 7}"#).unwrap();
        assert_eq!(wrapped.into_count(), 7);

        let aliased: ViewsPayload = serde_json::from_str(r#"{"views": 9}"#).unwrap();
        assert_eq!(aliased.into_count(), 9);
    }
}
