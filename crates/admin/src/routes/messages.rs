//! Contact inbox: list, reply, delete.
//!
//! Replies go through the API, which mails the sender; the console only
//! records that a reply exists.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use velora_api::contact::ContactMessage;
use velora_core::MessageId;

use crate::error::user_message;
use crate::filters;
use crate::middleware::{RequireAdminAuth, expire_admin};
use crate::routes::render;
use crate::state::AppState;

/// Message row for the inbox.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub reply: Option<String>,
    pub received_on: String,
}

impl From<&ContactMessage> for MessageView {
    fn from(message: &ContactMessage) -> Self {
        Self {
            id: message.id.to_string(),
            name: message.name.clone(),
            email: message.email.clone(),
            subject: message
                .subject
                .clone()
                .unwrap_or_else(|| "(no subject)".to_string()),
            message: message.message.clone(),
            reply: message.reply.clone(),
            received_on: message
                .created_at
                .map(|at| at.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Query parameters carrying a banner code after a redirect.
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Reply form field.
#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    pub reply: String,
}

fn success_text(code: &str) -> String {
    match code {
        "replied" => "Reply sent.".to_string(),
        "deleted" => "Message deleted.".to_string(),
        other => other.to_string(),
    }
}

/// Inbox template.
#[derive(Template)]
#[template(path = "messages/index.html")]
pub struct MessagesIndexTemplate {
    pub admin_email: String,
    pub current_path: &'static str,
    pub messages: Vec<MessageView>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Inbox page.
///
/// GET /messages
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ActionQuery>,
) -> Response {
    let (messages, error) = match state.api().contact_messages(&admin.token).await {
        Ok(messages) => (
            messages.iter().map(MessageView::from).collect(),
            query.error,
        ),
        Err(error) if error.is_unauthorized() => return expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to fetch contact messages");
            (Vec::new(), Some(user_message(&error)))
        }
    };

    let template = MessagesIndexTemplate {
        admin_email: admin.email,
        current_path: "/messages",
        messages,
        success: query.success.as_deref().map(success_text),
        error,
    };
    render(&template).into_response()
}

/// Send a reply to a message.
///
/// POST /messages/{id}/reply
#[instrument(skip(admin, state, session, form), fields(message_id = %id))]
pub async fn reply(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<MessageId>,
    axum::Form(form): axum::Form<ReplyForm>,
) -> Response {
    let text = form.reply.trim();
    if text.is_empty() {
        return Redirect::to("/messages?error=Reply%20can%27t%20be%20empty.").into_response();
    }

    match state.api().reply_to_message(&admin.token, &id, text).await {
        Ok(()) => {
            tracing::info!("Reply sent");
            Redirect::to("/messages?success=replied").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to send reply");
            Redirect::to(&format!(
                "/messages?error={}",
                urlencoding::encode(&user_message(&error))
            ))
            .into_response()
        }
    }
}

/// Delete a message.
///
/// POST /messages/{id}/delete
#[instrument(skip(admin, state, session), fields(message_id = %id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<MessageId>,
) -> Response {
    match state.api().delete_message(&admin.token, &id).await {
        Ok(()) => {
            tracing::info!("Message deleted");
            Redirect::to("/messages?success=deleted").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to delete message");
            Redirect::to(&format!(
                "/messages?error={}",
                urlencoding::encode(&user_message(&error))
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn message_views_fill_in_missing_subjects() {
        let message: ContactMessage = serde_json::from_str(
            r#"{"_id": "m1", "name": "Ana", "email": "ana@example.com",
                "message": "Is the serum vegan?"}"#,
        )
        .unwrap();
        let view = MessageView::from(&message);
        assert_eq!(view.subject, "(no subject)");
        assert!(view.reply.is_none());
        assert_eq!(view.received_on, "");
    }
}
