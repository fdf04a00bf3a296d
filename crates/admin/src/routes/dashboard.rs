//! Dashboard route handler.

use askama::Template;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use velora_api::ApiError;
use velora_api::orders::Order;
use velora_core::Price;

use crate::error::user_message;
use crate::filters;
use crate::middleware::{RequireAdminAuth, expire_admin};
use crate::routes::render;
use crate::state::AppState;

/// How many of the newest orders the dashboard shows.
const RECENT_ORDERS: usize = 5;

/// Dashboard metrics.
#[derive(Debug, Clone, Default)]
pub struct DashboardMetrics {
    pub products: String,
    pub orders: String,
    pub open_orders: String,
    pub unreplied_messages: String,
}

/// Recent order row for the dashboard.
#[derive(Debug, Clone)]
pub struct RecentOrderView {
    pub id: String,
    pub customer: String,
    pub placed_on: String,
    pub total: String,
    pub status: String,
}

impl From<&Order> for RecentOrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer: order
                .customer_email
                .clone()
                .unwrap_or_else(|| "Guest".to_string()),
            placed_on: order
                .created_at
                .map(|at| at.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
            total: format_price(order.total_amount()),
            status: order.status.label().to_string(),
        }
    }
}

fn format_price(price: Price) -> String {
    format!("${price}")
}

/// Dashboard page template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_email: String,
    pub current_path: &'static str,
    pub metrics: DashboardMetrics,
    pub recent_orders: Vec<RecentOrderView>,
    pub error: Option<String>,
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Response {
    let (products_result, orders_result, messages_result) = tokio::join!(
        state.api().products(),
        state.api().all_orders(&admin.token),
        state.api().contact_messages(&admin.token),
    );

    // One expired token ends the session; the other results don't matter
    // at that point.
    if orders_result.as_ref().err().is_some_and(ApiError::is_unauthorized)
        || messages_result.as_ref().err().is_some_and(ApiError::is_unauthorized)
    {
        return expire_admin(&session).await;
    }

    let mut error = None;

    let product_count = products_result.map_or_else(
        |e| {
            tracing::error!(error = %e, "Failed to fetch products for dashboard");
            error = Some(user_message(&e));
            "0".to_string()
        },
        |products| products.len().to_string(),
    );

    let (order_count, open_count, recent_orders) = orders_result.map_or_else(
        |e| {
            tracing::error!(error = %e, "Failed to fetch orders for dashboard");
            error = Some(user_message(&e));
            ("0".to_string(), "0".to_string(), Vec::new())
        },
        |orders| {
            let open = orders
                .iter()
                .filter(|order| !order.status.is_terminal())
                .count();
            let recent = orders
                .iter()
                .take(RECENT_ORDERS)
                .map(RecentOrderView::from)
                .collect();
            (orders.len().to_string(), open.to_string(), recent)
        },
    );

    let unreplied = messages_result.map_or_else(
        |e| {
            tracing::error!(error = %e, "Failed to fetch messages for dashboard");
            "0".to_string()
        },
        |messages| {
            messages
                .iter()
                .filter(|message| !message.is_replied())
                .count()
                .to_string()
        },
    );

    let template = DashboardTemplate {
        admin_email: admin.email,
        current_path: "/",
        metrics: DashboardMetrics {
            products: product_count,
            orders: order_count,
            open_orders: open_count,
            unreplied_messages: unreplied,
        },
        recent_orders,
        error,
    };
    render(&template).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn recent_order_views_fall_back_for_sparse_orders() {
        let order: Order = serde_json::from_str(
            r#"{"_id": "o9", "items": [{"price": 12, "quantity": 2}], "status": "pending"}"#,
        )
        .unwrap();
        let view = RecentOrderView::from(&order);
        assert_eq!(view.customer, "Guest");
        assert_eq!(view.placed_on, "");
        assert_eq!(view.total, "$24.00");
        assert_eq!(view.status, "Pending");
    }
}
