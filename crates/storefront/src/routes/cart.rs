//! Cart route handlers.
//!
//! Every mutation goes through [`CartController`], so quantity changes are
//! optimistic-with-rollback and removals are reconciled against the API
//! before the fragment re-renders. Fragments swap in via HTMX, and every
//! successful mutation carries an `HX-Trigger: cart-updated` header so the
//! navbar badge re-fetches itself.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use velora_api::auth::Credentials;
use velora_api::cart::subtotal;
use velora_api::{ApiError, CartController, CartItem, QuantityOutcome};
use velora_core::{Price, ProductId};

use crate::error::{add_breadcrumb, cart_user_message, user_message};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth, expire_session};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    /// Value the mutation forms post back: the product id when the line has
    /// one, otherwise the raw line id.
    pub identity: String,
    pub name: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    pub image: Option<String>,
    pub category: Option<String>,
    /// Lines without a product id cannot be mutated; templates render them
    /// without quantity or remove controls.
    pub mutable: bool,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: "$0.00".to_string(),
            item_count: 0,
        }
    }

    /// Project normalized cart lines into display data.
    #[must_use]
    pub fn from_items(items: &[CartItem]) -> Self {
        Self {
            items: items.iter().map(CartItemView::from).collect(),
            subtotal: format_price(subtotal(items)),
            item_count: items
                .iter()
                .fold(0u32, |acc, item| acc.saturating_add(item.quantity)),
        }
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

/// Format a price for display.
fn format_price(price: Price) -> String {
    format!("${price}")
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        let identity = item.product_id.as_ref().map_or_else(
            || item.line_id.as_str().to_string(),
            |product_id| product_id.as_str().to_string(),
        );
        Self {
            identity,
            name: item.name.clone(),
            quantity: item.quantity,
            price: format_price(item.price),
            line_price: format_price(item.line_total()),
            image: item.image.clone(),
            category: item.category.clone(),
            mutable: item.product_id.is_some(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub identity: String,
    pub quantity: i64,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub identity: String,
    /// Set to `"true"` by the confirmation dialog. Removal is refused
    /// without it.
    pub confirm: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub error: Option<String>,
    pub signed_in: bool,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Add-to-cart result fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/add_result.html")]
pub struct AddResultTemplate {
    pub ok: bool,
    pub message: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Build a controller over a fresh fetch of the shopper's cart.
pub(crate) async fn load_controller(
    state: &AppState,
    credentials: &Credentials,
) -> Result<CartController, ApiError> {
    CartController::load(
        state.api().clone(),
        credentials.token.clone(),
        state.cart_events().clone(),
    )
    .await
}

/// The cart fragment with the current controller state and an error banner.
fn cart_fragment(controller: &CartController, error: Option<String>) -> Response {
    CartItemsTemplate {
        cart: CartView::from_items(controller.items()),
        error,
    }
    .into_response()
}

/// The cart fragment after a successful mutation, with the badge trigger.
fn cart_fragment_updated(controller: &CartController) -> Response {
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::from_items(controller.items()),
            error: None,
        },
    )
        .into_response()
}

/// Display cart page.
#[instrument(skip(state, session, headers, credentials))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    match load_controller(&state, &credentials).await {
        Ok(controller) => CartShowTemplate {
            cart: CartView::from_items(controller.items()),
            error: None,
            signed_in: true,
        }
        .into_response(),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to load cart");
            CartShowTemplate {
                cart: CartView::empty(),
                error: Some(user_message(&error)),
                signed_in: true,
            }
            .into_response()
        }
    }
}

/// Add a product to the cart (HTMX).
///
/// Returns an inline result message next to the button; the badge updates
/// itself off the `cart-updated` trigger.
#[instrument(skip(state, session, headers, credentials))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);
    let quantity = form.quantity.unwrap_or(1).max(1);
    add_breadcrumb("cart", "add to cart");

    match state
        .api()
        .add_to_cart(&credentials.token, &product_id, quantity)
        .await
    {
        Ok(()) => {
            state.cart_events().notify();
            (
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                AddResultTemplate {
                    ok: true,
                    message: "Added to your cart.".to_string(),
                },
            )
                .into_response()
        }
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to add item to cart");
            AddResultTemplate {
                ok: false,
                message: user_message(&error),
            }
            .into_response()
        }
    }
}

/// Set a line's quantity (HTMX).
///
/// A quantity below 1 never reaches the API; the fragment re-renders
/// unchanged with a hint to use Remove instead. Server rejections render
/// the rolled-back state with the server's own message.
#[instrument(skip(state, session, headers, credentials))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let mut controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart before quantity update");
            return CartItemsTemplate {
                cart: CartView::empty(),
                error: Some(user_message(&error)),
            }
            .into_response();
        }
    };

    match controller.set_quantity(&form.identity, form.quantity).await {
        Ok(QuantityOutcome::Updated) => cart_fragment_updated(&controller),
        Ok(QuantityOutcome::Rejected) => cart_fragment(
            &controller,
            Some("Quantities below 1 aren't allowed. Use Remove to take an item out.".to_string()),
        ),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to update cart quantity");
            cart_fragment(&controller, Some(cart_user_message(&error)))
        }
    }
}

/// Remove a line from the cart (HTMX).
///
/// The browser dialog sets `confirm`; a request arriving without it
/// re-renders the fragment unchanged. Once the API acknowledges, the
/// controller polls until the removal is visible, forcing the line out
/// locally when the poll budget runs out.
#[instrument(skip(state, session, headers, credentials))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let mut controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart before removal");
            return CartItemsTemplate {
                cart: CartView::empty(),
                error: Some(user_message(&error)),
            }
            .into_response();
        }
    };

    if form.confirm.as_deref() != Some("true") {
        return cart_fragment(
            &controller,
            Some("Removal was not confirmed.".to_string()),
        );
    }

    add_breadcrumb("cart", "remove line");
    match controller.remove_item(&form.identity).await {
        Ok(_) => cart_fragment_updated(&controller),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to remove cart line");
            cart_fragment(&controller, Some(cart_user_message(&error)))
        }
    }
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session, headers, credentials))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    let mut controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart before clearing");
            return CartItemsTemplate {
                cart: CartView::empty(),
                error: Some(user_message(&error)),
            }
            .into_response();
        }
    };

    add_breadcrumb("cart", "clear cart");
    match controller.clear().await {
        Ok(()) => cart_fragment_updated(&controller),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to clear cart");
            cart_fragment(&controller, Some(cart_user_message(&error)))
        }
    }
}

/// Re-fetch the cart from the API and re-render (HTMX).
///
/// Replaces local state whether or not anything differs, and notifies so
/// every other view re-fetches too.
#[instrument(skip(state, session, headers, credentials))]
pub async fn refresh(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    RequireAuth(credentials): RequireAuth,
) -> Response {
    let mut controller = match load_controller(&state, &credentials).await {
        Ok(controller) => controller,
        Err(error) if error.is_unauthorized() => {
            return expire_session(&session, &headers).await;
        }
        Err(error) => {
            tracing::error!(%error, "Failed to load cart before refresh");
            return CartItemsTemplate {
                cart: CartView::empty(),
                error: Some(user_message(&error)),
            }
            .into_response();
        }
    };

    match controller.force_refresh().await {
        Ok(()) => cart_fragment_updated(&controller),
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::error!(%error, "Failed to refresh cart");
            cart_fragment(&controller, Some(cart_user_message(&error)))
        }
    }
}

/// Cart count badge (HTMX).
///
/// Counts are cached per token with a short TTL; every cart change event
/// drops the cache, so the next badge render re-fetches. Signed-out
/// shoppers get a zero without touching the API.
#[instrument(skip(state, session, headers, credentials))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    OptionalAuth(credentials): OptionalAuth,
) -> Response {
    let Some(credentials) = credentials else {
        return CartCountTemplate { count: 0 }.into_response();
    };

    let cache_key = credentials.token.as_str().to_string();
    if let Some(count) = state.badge_counts().get(&cache_key).await {
        return CartCountTemplate { count }.into_response();
    }

    match state.api().fetch_cart_items(&credentials.token).await {
        Ok(items) => {
            let count = items
                .iter()
                .fold(0u32, |acc, item| acc.saturating_add(item.quantity));
            state.badge_counts().insert(cache_key, count).await;
            CartCountTemplate { count }.into_response()
        }
        Err(error) if error.is_unauthorized() => expire_session(&session, &headers).await,
        Err(error) => {
            tracing::warn!(%error, "Failed to fetch cart for the badge");
            CartCountTemplate { count: 0 }.into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use velora_api::cart::parse_cart_payload;

    #[test]
    fn views_prefer_the_product_id_as_identity() {
        let items = parse_cart_payload(
            r#"[
                {"_id": "line1", "productId": "p1", "name": "Dew Serum", "price": "18.50", "quantity": 2},
                {"_id": "line2", "name": "Mystery", "price": 4, "quantity": 1}
            ]"#,
        )
        .unwrap();

        let view = CartView::from_items(&items);
        assert_eq!(view.items[0].identity, "p1");
        assert!(view.items[0].mutable);
        assert_eq!(view.items[0].line_price, "$37.00");
        assert_eq!(view.items[1].identity, "line2");
        assert!(!view.items[1].mutable);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$41.00");
    }

    #[test]
    fn empty_view_formats_a_zero_subtotal() {
        let view = CartView::empty();
        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, "$0.00");
        assert_eq!(view.item_count, 0);
    }
}
