//! Checkout route handlers.
//!
//! Checkout is a two-step flow: the shipping form creates the order, then
//! the payment page hands off to the external gateway. The created order
//! travels between the two steps as a [`PendingOrder`] in the session, so a
//! shopper who abandons the gateway can come back and retry payment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use velora_api::orders::{CheckoutError, OrderDraft, OrderLine};
use velora_core::Price;

use crate::error::{add_breadcrumb, user_message};
use crate::filters;
use crate::middleware::{RequireAuth, expire_session};
use crate::models::{PendingOrder, session_keys};
use crate::routes::cart::{CartView, load_controller};
use crate::state::AppState;

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: line.name.clone(),
            quantity: line.quantity,
            price: format_price(line.price),
            line_price: format_price(line.line_total()),
        }
    }
}

/// Pending order display data for the payment page.
#[derive(Clone)]
pub struct PendingOrderView {
    pub order_id: String,
    pub items: Vec<OrderLineView>,
    pub shipping_address: String,
    pub order_notes: String,
    pub total: String,
}

impl From<&PendingOrder> for PendingOrderView {
    fn from(pending: &PendingOrder) -> Self {
        Self {
            order_id: pending.order_id.as_str().to_string(),
            items: pending.items.iter().map(OrderLineView::from).collect(),
            shipping_address: pending.shipping_address.clone(),
            order_notes: pending.order_notes.clone(),
            total: format_price(pending.total),
        }
    }
}

/// Format a price for display.
fn format_price(price: Price) -> String {
    format!("${price}")
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub shipping_address: String,
    pub order_notes: Option<String>,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutShowTemplate {
    pub cart: CartView,
    pub shipping_address: String,
    pub order_notes: String,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/pay.html")]
pub struct CheckoutPayTemplate {
    pub order: PendingOrderView,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Display the checkout page.
///
/// An empty cart has nothing to check out; the shopper goes back to the
/// cart page instead of seeing an order form over nothing.
#[instrument(skip(state, session, headers, credentials))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    let controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart for checkout");
            return Redirect::to("/cart").into_response();
        }
    };

    if controller.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    CheckoutShowTemplate {
        cart: CartView::from_items(controller.items()),
        shipping_address: String::new(),
        order_notes: String::new(),
        error: None,
        signed_in: true,
    }
    .into_response()
}

/// Create the order and move on to payment.
///
/// Lines without a product id are dropped during assembly; a cart that
/// yields no orderable lines refuses to become an order. On success the
/// created order is stashed in the session and the shopper lands on the
/// payment page.
#[instrument(skip(state, session, headers, credentials, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
    Form(form): Form<CheckoutForm>,
) -> Response {
    let shipping_address = form.shipping_address.trim().to_string();
    let order_notes = form.order_notes.unwrap_or_default().trim().to_string();

    let controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart for order submission");
            return Redirect::to("/cart").into_response();
        }
    };

    let rerender = |error: String| {
        CheckoutShowTemplate {
            cart: CartView::from_items(controller.items()),
            shipping_address: shipping_address.clone(),
            order_notes: order_notes.clone(),
            error: Some(error),
            signed_in: true,
        }
        .into_response()
    };

    if shipping_address.is_empty() {
        return rerender("Please enter a shipping address.".to_string());
    }

    let draft = match OrderDraft::assemble(controller.items(), &shipping_address, &order_notes) {
        Ok(draft) => draft,
        Err(CheckoutError::NoOrderableLines) => {
            return rerender("None of the items in your cart can be ordered.".to_string());
        }
        Err(CheckoutError::Api(error)) => {
            return rerender(user_message(&error));
        }
    };

    add_breadcrumb("checkout", "create order");
    match state.api().create_order(&credentials.token, &draft).await {
        Ok(order_id) => {
            let pending = PendingOrder {
                order_id,
                email: credentials.email.clone(),
                items: draft.items().to_vec(),
                shipping_address: shipping_address.clone(),
                order_notes: order_notes.clone(),
                total: draft.total(),
            };
            if let Err(error) = session.insert(session_keys::PENDING_ORDER, &pending).await {
                tracing::error!(%error, "Failed to stash pending order in session");
                return rerender("Something went wrong on our side. Please try again.".to_string());
            }

            // The backend consumes the cart when it creates the order; let
            // every open view re-fetch and find out.
            state.cart_events().notify();
            Redirect::to("/checkout/pay").into_response()
        }
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to create order");
            rerender(user_message(&error))
        }
    }
}

/// Display the payment page for the pending order.
#[instrument(skip(session))]
pub async fn pay_page(session: Session, RequireAuth(_): RequireAuth) -> Response {
    let Some(pending) = pending_order(&session).await else {
        return Redirect::to("/cart").into_response();
    };

    CheckoutPayTemplate {
        order: PendingOrderView::from(&pending),
        error: None,
        signed_in: true,
    }
    .into_response()
}

/// Initiate payment and hand the shopper to the gateway.
#[instrument(skip(state, session, headers, credentials))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    let Some(pending) = pending_order(&session).await else {
        return Redirect::to("/cart").into_response();
    };

    add_breadcrumb("checkout", "initiate payment");
    match state
        .api()
        .initiate_payment(&credentials.token, &pending.email, &pending.order_id)
        .await
    {
        Ok(gateway_url) => {
            if let Err(error) = session
                .remove::<PendingOrder>(session_keys::PENDING_ORDER)
                .await
            {
                tracing::error!(%error, "Failed to drop pending order from session");
            }
            Redirect::to(gateway_url.as_str()).into_response()
        }
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to initiate payment");
            CheckoutPayTemplate {
                order: PendingOrderView::from(&pending),
                error: Some(user_message(&error)),
                signed_in: true,
            }
            .into_response()
        }
    }
}

/// Read the pending order from the session.
async fn pending_order(session: &Session) -> Option<PendingOrder> {
    session
        .get::<PendingOrder>(session_keys::PENDING_ORDER)
        .await
        .ok()
        .flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use velora_core::OrderId;

    fn price(text: &str) -> Price {
        serde_json::from_str(&format!("\"{text}\"")).unwrap()
    }

    #[test]
    fn pending_order_view_preformats_prices() {
        let pending = PendingOrder {
            order_id: OrderId::new("ord-1"),
            email: "shopper@example.com".to_string(),
            items: vec![OrderLine {
                product_id: "p1".into(),
                name: "Dew Serum".to_string(),
                price: price("18.50"),
                quantity: 2,
            }],
            shipping_address: "1 Glow Lane".to_string(),
            order_notes: String::new(),
            total: price("37.00"),
        };

        let view = PendingOrderView::from(&pending);
        assert_eq!(view.order_id, "ord-1");
        assert_eq!(view.items[0].line_price, "$37.00");
        assert_eq!(view.total, "$37.00");
    }
}
