//! Contact form endpoints: public submission, admin inbox.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use velora_core::{BearerToken, MessageId};

use crate::client::ApiClient;
use crate::error::ApiError;

/// A contact form submission as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    #[serde(alias = "_id")]
    pub id: MessageId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ContactMessage {
    /// Whether an admin has already replied.
    #[must_use]
    pub const fn is_replied(&self) -> bool {
        self.reply.is_some()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MessageListPayload {
    Bare(Vec<ContactMessage>),
    Wrapped { messages: Vec<ContactMessage> },
}

impl MessageListPayload {
    fn into_messages(self) -> Vec<ContactMessage> {
        let (Self::Bare(messages) | Self::Wrapped { messages }) = self;
        messages
    }
}

#[derive(Serialize)]
struct SendBody<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct ReplyBody<'a> {
    message: &'a str,
}

impl ApiClient {
    /// Submit the public contact form.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the submission.
    #[instrument(skip(self, message))]
    pub async fn send_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), ApiError> {
        self.post_ack(
            "/api/contact/send",
            None,
            &SendBody {
                name,
                email,
                subject,
                message,
            },
        )
        .await
    }

    /// Every contact message. Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self, token))]
    pub async fn contact_messages(&self, token: &BearerToken) -> Result<Vec<ContactMessage>, ApiError> {
        let payload: MessageListPayload = self.get_json("/api/contact/all", Some(token)).await?;
        Ok(payload.into_messages())
    }

    /// Reply to a contact message. The API mails the reply to the sender.
    /// Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the reply.
    #[instrument(skip(self, token, message), fields(message_id = %message_id))]
    pub async fn reply_to_message(
        &self,
        token: &BearerToken,
        message_id: &MessageId,
        message: &str,
    ) -> Result<(), ApiError> {
        self.post_ack(
            &format!("/api/contact/reply/{message_id}"),
            Some(token),
            &ReplyBody { message },
        )
        .await
    }

    /// Delete a contact message. Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the deletion.
    #[instrument(skip(self, token), fields(message_id = %message_id))]
    pub async fn delete_message(
        &self,
        token: &BearerToken,
        message_id: &MessageId,
    ) -> Result<(), ApiError> {
        self.delete_ack::<()>(&format!("/api/contact/delete/{message_id}"), Some(token), None)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn message_lists_decode_bare_and_wrapped() {
        let raw = r#"[{
            "_id": "m1",
            "name": "Ana",
            "email": "ana@example.com",
            "message": "Is the serum vegan?",
            "createdAt": "2026-03-01T09:30:00Z"
        }]"#;
        let bare: MessageListPayload = serde_json::from_str(raw).unwrap();
        let messages = bare.into_messages();
        assert_eq!(messages[0].id.as_str(), "m1");
        assert!(!messages[0].is_replied());
        assert!(messages[0].created_at.is_some());

        let wrapped: MessageListPayload = serde_json::from_str(
            r#"{"messages": [{"id": "m2", "name": "Bo", "email": "bo@example.com",
                "message": "hi", "reply": "hello"}]}"#,
        )
        .unwrap();
        assert!(wrapped.into_messages()[0].is_replied());
    }
}
