//! Order management: list all orders, move them through the lifecycle.

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use velora_api::orders::Order;
use velora_core::{OrderId, OrderStatus};

use crate::error::user_message;
use crate::filters;
use crate::middleware::{RequireAdminAuth, expire_admin};
use crate::routes::render;
use crate::state::AppState;

/// Order line for the expanded row.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub line_total: String,
}

/// One entry in the status dropdown, preselected to the order's current state.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: String,
    pub label: &'static str,
    pub selected: bool,
}

/// Order row for the listing table.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: String,
    pub customer: String,
    pub placed_on: String,
    pub shipping_address: String,
    pub total: String,
    pub status_label: &'static str,
    pub status_options: Vec<StatusOption>,
    pub items: Vec<OrderLineView>,
}

impl From<&Order> for OrderRowView {
    fn from(order: &Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| OrderLineView {
                name: item.display_name().to_string(),
                quantity: item.quantity.unwrap_or(1),
                line_total: format!("${}", item.line_total()),
            })
            .collect();

        let status_options = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusOption {
                value: status.to_string(),
                label: status.label(),
                selected: status == order.status,
            })
            .collect();

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
            shipping_address: order.shipping_address.clone().unwrap_or_default(),
            total: format!("${}", order.total_amount()),
            status_label: order.status.label(),
            status_options,
            items,
        }
    }
}

/// Query parameters carrying a banner code after a redirect.
#[derive(Debug, Deserialize)]
pub struct ActionQuery {
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Status form field.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// Orders listing template.
#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_email: String,
    pub current_path: &'static str,
    pub orders: Vec<OrderRowView>,
    pub success: Option<String>,
    pub error: Option<String>,
}

/// Orders listing page.
///
/// GET /orders
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ActionQuery>,
) -> Response {
    let (orders, error) = match state.api().all_orders(&admin.token).await {
        Ok(orders) => (orders.iter().map(OrderRowView::from).collect(), query.error),
        Err(error) if error.is_unauthorized() => return expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to fetch orders");
            (Vec::new(), Some(user_message(&error)))
        }
    };

    let template = OrdersIndexTemplate {
        admin_email: admin.email,
        current_path: "/orders",
        orders,
        success: query.success.map(|_| "Order updated.".to_string()),
        error,
    };
    render(&template).into_response()
}

/// Move an order to the selected status.
///
/// POST /orders/{id}/status
#[instrument(skip(admin, state, session), fields(order_id = %id, status = %form.status))]
pub async fn set_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<OrderId>,
    axum::Form(form): axum::Form<StatusForm>,
) -> Response {
    match state
        .api()
        .set_order_status(&admin.token, &id, form.status)
        .await
    {
        Ok(()) => {
            tracing::info!("Order status updated");
            Redirect::to("/orders?success=updated").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_admin(&session).await,
        Err(error) => {
            tracing::error!(%error, "Failed to update order status");
            Redirect::to(&format!(
                "/orders?error={}",
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
    fn order_rows_carry_lines_and_status() {
        let order: Order = serde_json::from_str(
            r#"{
                "_id": "o1",
                "userEmail": "ana@example.com",
                "status": "processing",
                "shippingAddress": "1 Main St",
                "items": [
                    {"productId": "p1", "name": "Dew Serum", "price": 28, "quantity": 2},
                    {"price": 3}
                ]
            }"#,
        )
        .unwrap();
        let row = OrderRowView::from(&order);
        assert_eq!(row.customer, "ana@example.com");
        assert_eq!(row.status_label, "Processing");
        assert_eq!(row.items.len(), 2);
        assert_eq!(row.items[0].line_total, "$56.00");
        assert_eq!(row.items[1].name, "Unknown product");
        assert_eq!(row.total, "$59.00");

        let selected: Vec<_> = row
            .status_options
            .iter()
            .filter(|option| option.selected)
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "processing");
    }
}
