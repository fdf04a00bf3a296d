//! Account route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use velora_api::auth::Profile;
use velora_api::orders::Order;
use velora_core::UserRole;

use crate::error::user_message;
use crate::filters;
use crate::middleware::{RequireAuth, expire_session};
use crate::state::AppState;

/// Profile display data for templates.
#[derive(Clone)]
pub struct ProfileView {
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub member_since: Option<String>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            role: match profile.role {
                UserRole::Admin => "Administrator".to_string(),
                UserRole::User => "Customer".to_string(),
            },
            member_since: profile
                .created_at
                .map(|created_at| created_at.format("%B %Y").to_string()),
        }
    }
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: String,
    pub placed_on: Option<String>,
    pub status: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub name: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_str().to_string(),
            placed_on: order
                .created_at
                .map(|created_at| created_at.format("%b %-d, %Y").to_string()),
            status: order.status.label().to_string(),
            total: format!("${}", order.total_amount()),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    name: item.display_name().to_string(),
                    quantity: item.quantity.unwrap_or(1),
                    line_total: format!("${}", item.line_total()),
                })
                .collect(),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/show.html")]
pub struct AccountShowTemplate {
    pub profile: Option<ProfileView>,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct AccountOrdersTemplate {
    pub orders: Vec<OrderView>,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Display the account overview.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    match state.api().profile(&credentials.token).await {
        Ok(profile) => AccountShowTemplate {
            profile: Some(ProfileView::from(&profile)),
            error: None,
            signed_in: true,
        }
        .into_response(),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to load profile");
            AccountShowTemplate {
                profile: None,
                error: Some(user_message(&error)),
                signed_in: true,
            }
            .into_response()
        }
    }
}

/// Display the shopper's order history, newest as the API returns it.
pub async fn orders(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    match state.api().my_orders(&credentials.token).await {
        Ok(orders) => AccountOrdersTemplate {
            orders: orders.iter().map(OrderView::from).collect(),
            error: None,
            signed_in: true,
        }
        .into_response(),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to load order history");
            AccountOrdersTemplate {
                orders: Vec::new(),
                error: Some(user_message(&error)),
                signed_in: true,
            }
            .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn order_views_survive_sparse_lines() {
        let order: Order = serde_json::from_str(
            r#"{
                "_id": "ord-9",
                "status": "shipped",
                "items": [{"price": "12.00"}, {"name": "Dew Serum", "quantity": 2}]
            }"#,
        )
        .unwrap();

        let view = OrderView::from(&order);
        assert_eq!(view.status, "Shipped");
        assert_eq!(view.items[0].name, "Unknown product");
        assert_eq!(view.items[0].line_total, "$12.00");
        assert_eq!(view.items[1].quantity, 2);
        assert_eq!(view.total, "$12.00");
    }
}
