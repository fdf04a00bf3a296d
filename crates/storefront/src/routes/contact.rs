//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::user_message;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::auth::MessageQuery;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact/show.html")]
pub struct ContactTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub signed_in: bool,
}

/// Map a contact redirect code to banner text.
fn banner_text(code: String) -> String {
    match code.as_str() {
        "sent" => "Thanks for reaching out. We'll get back to you soon.".to_string(),
        "missing_fields" => "Please fill in every field before sending.".to_string(),
        _ => code,
    }
}

/// Display the contact page.
pub async fn show(
    Query(query): Query<MessageQuery>,
    OptionalAuth(auth): OptionalAuth,
) -> impl IntoResponse {
    ContactTemplate {
        error: query.error.map(banner_text),
        success: query.success.map(banner_text),
        signed_in: auth.is_some(),
    }
}

/// Handle contact form submission.
pub async fn submit(State(state): State<AppState>, Form(form): Form<ContactForm>) -> Response {
    let name = form.name.trim();
    let email = form.email.trim();
    let subject = form.subject.trim();
    let message = form.message.trim();

    if name.is_empty() || email.is_empty() || subject.is_empty() || message.is_empty() {
        return Redirect::to("/contact?error=missing_fields").into_response();
    }

    match state
        .api()
        .send_contact_message(name, email, subject, message)
        .await
    {
        Ok(()) => Redirect::to("/contact?success=sent").into_response(),
        Err(error) => {
            tracing::warn!(%error, "Failed to send contact message");
            Redirect::to(&format!(
                "/contact?error={}",
                urlencoding::encode(&user_message(&error))
            ))
            .into_response()
        }
    }
}
