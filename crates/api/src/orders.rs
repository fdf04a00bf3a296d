//! Order assembly and order endpoints.
//!
//! Assembly is the gate between the cart and the order API: cart lines that
//! never resolved a product id render fine in the cart but cannot be ordered,
//! so they are dropped here with a logged error rather than silently
//! submitted and bounced by the server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use velora_core::{BearerToken, OrderId, OrderStatus, Price, ProductId};

use crate::cart::CartItem;
use crate::cart::normalize::FALLBACK_NAME;
use crate::client::ApiClient;
use crate::error::ApiError;

/// One line of an order submission, as the API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
}

impl OrderLine {
    /// Price times quantity, saturating.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// Errors from order assembly and submission.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No cart line carried a product id, so there is nothing the order
    /// API could accept.
    #[error("none of the cart lines can be ordered")]
    NoOrderableLines,
}

impl CheckoutError {
    /// Whether the underlying failure was a 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized))
    }
}

/// An order ready to submit: at least one orderable line plus shipping
/// details.
///
/// Serializes to the exact creation body the API expects, so it can be
/// posted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(skip)]
    primary_product_id: ProductId,
    items: Vec<OrderLine>,
    shipping_address: String,
    order_notes: String,
}

impl OrderDraft {
    /// Assemble a draft from normalized cart lines.
    ///
    /// Lines without a product id cannot be addressed by the order API;
    /// each one is dropped with a logged error. Surviving lines keep their
    /// cart order.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoOrderableLines`] when no line survives, whether
    /// because the cart was empty or because every line was display-only.
    pub fn assemble(
        items: &[CartItem],
        shipping_address: impl Into<String>,
        order_notes: impl Into<String>,
    ) -> Result<Self, CheckoutError> {
        let lines: Vec<OrderLine> = items
            .iter()
            .filter_map(|item| match &item.product_id {
                Some(product_id) => Some(OrderLine {
                    product_id: product_id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                }),
                None => {
                    error!(
                        line_id = %item.line_id,
                        name = %item.name,
                        "cart line has no product id; dropping it from the order"
                    );
                    None
                }
            })
            .collect();

        let Some(first) = lines.first() else {
            return Err(CheckoutError::NoOrderableLines);
        };

        Ok(Self {
            primary_product_id: first.product_id.clone(),
            items: lines,
            shipping_address: shipping_address.into(),
            order_notes: order_notes.into(),
        })
    }

    /// The lines that survived assembly, in cart order.
    #[must_use]
    pub fn items(&self) -> &[OrderLine] {
        &self.items
    }

    #[must_use]
    pub fn shipping_address(&self) -> &str {
        &self.shipping_address
    }

    #[must_use]
    pub fn order_notes(&self) -> &str {
        &self.order_notes
    }

    /// Sum of line totals.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items
            .iter()
            .fold(Price::ZERO, |acc, line| acc.saturating_add(line.line_total()))
    }

    /// Product id the creation endpoint is addressed with. The API mounts
    /// order creation under a product path segment; the body carries the
    /// real line list.
    #[must_use]
    pub fn primary_product_id(&self) -> &ProductId {
        &self.primary_product_id
    }
}

// =============================================================================
// Fetched orders
// =============================================================================

/// A line inside a fetched order. Every field is optional; orders placed
/// before a catalog change can reference products that no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, alias = "productId")]
    pub product_id: Option<ProductId>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl OrderItem {
    /// Name for display, with a fallback for nameless lines.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_NAME)
    }

    /// Price times quantity, treating absent fields as zero and one.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price
            .unwrap_or(Price::ZERO)
            .line_total(self.quantity.unwrap_or(1))
    }
}

/// An order as returned by the list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, alias = "totalAmount")]
    pub total: Option<Price>,
    #[serde(default, alias = "shippingAddress")]
    pub shipping_address: Option<String>,
    #[serde(default, alias = "orderNotes")]
    pub order_notes: Option<String>,
    #[serde(default, alias = "userEmail", alias = "email")]
    pub customer_email: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Server-reported total when present, otherwise the sum of line totals.
    #[must_use]
    pub fn total_amount(&self) -> Price {
        self.total.unwrap_or_else(|| {
            self.items
                .iter()
                .fold(Price::ZERO, |acc, item| acc.saturating_add(item.line_total()))
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderListPayload {
    Bare(Vec<Order>),
    Wrapped { orders: Vec<Order> },
}

impl OrderListPayload {
    fn into_orders(self) -> Vec<Order> {
        let (Self::Bare(orders) | Self::Wrapped { orders }) = self;
        orders
    }
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    #[serde(alias = "_id", alias = "orderId")]
    id: Option<OrderId>,
    order: Option<CreatedOrderRef>,
}

#[derive(Deserialize)]
struct CreatedOrderRef {
    #[serde(alias = "_id")]
    id: Option<OrderId>,
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

// =============================================================================
// Endpoints
// =============================================================================

impl ApiClient {
    /// Submit an assembled order and return the id the API assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the order or the response
    /// carries no recognizable order id.
    #[instrument(skip(self, token, draft), fields(lines = draft.items().len()))]
    pub async fn create_order(
        &self,
        token: &BearerToken,
        draft: &OrderDraft,
    ) -> Result<OrderId, ApiError> {
        let path = format!("/api/orders/{}", draft.primary_product_id());
        let response: CreateOrderResponse = self.post_json(&path, Some(token), draft).await?;
        response
            .id
            .or_else(|| response.order.and_then(|order| order.id))
            .ok_or_else(|| {
                ApiError::UnexpectedPayload("order creation response carries no order id".into())
            })
    }

    /// Orders belonging to the signed-in shopper.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &BearerToken) -> Result<Vec<Order>, ApiError> {
        let payload: OrderListPayload = self.get_json("/api/orders/my", Some(token)).await?;
        Ok(payload.into_orders())
    }

    /// Every order in the store. Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the payload does not decode.
    #[instrument(skip(self, token))]
    pub async fn all_orders(&self, token: &BearerToken) -> Result<Vec<Order>, ApiError> {
        let payload: OrderListPayload = self.get_json("/api/orders/all", Some(token)).await?;
        Ok(payload.into_orders())
    }

    /// Move an order to a new lifecycle status. Admin only.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the transition.
    #[instrument(skip(self, token), fields(order_id = %order_id, status = %status))]
    pub async fn set_order_status(
        &self,
        token: &BearerToken,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        self.put_ack(
            &format!("/api/orders/{order_id}/status"),
            Some(token),
            &StatusBody { status },
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::parse_cart_payload;

    fn mixed_cart() -> Vec<CartItem> {
        parse_cart_payload(
            r#"[
                {"_id": "line1", "name": "Gift Wrap", "price": 3, "quantity": 1},
                {"_id": "line2", "productId": "p2", "name": "Dew Serum", "price": 10, "quantity": 2},
                {"_id": "line3", "productId": "p3", "name": "Night Cream", "price": 20, "quantity": 1}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn assembly_drops_lines_without_product_ids() {
        let draft = OrderDraft::assemble(&mixed_cart(), "1 Main St", "").unwrap();

        let ids: Vec<&str> = draft
            .items()
            .iter()
            .map(|line| line.product_id.as_str())
            .collect();
        assert_eq!(ids, ["p2", "p3"]);
        assert_eq!(draft.primary_product_id().as_str(), "p2");
        assert_eq!(draft.total().to_string(), "40.00");
    }

    #[test]
    fn assembly_refuses_a_cart_with_no_orderable_lines() {
        let display_only = parse_cart_payload(
            r#"[{"_id": "line1", "name": "Gift Wrap", "price": 3, "quantity": 1}]"#,
        )
        .unwrap();

        let err = OrderDraft::assemble(&display_only, "1 Main St", "").unwrap_err();
        assert!(matches!(err, CheckoutError::NoOrderableLines));

        let err = OrderDraft::assemble(&[], "1 Main St", "").unwrap_err();
        assert!(matches!(err, CheckoutError::NoOrderableLines));
    }

    #[test]
    fn draft_serializes_to_the_creation_body() {
        let draft = OrderDraft::assemble(&mixed_cart(), "1 Main St", "ring the bell").unwrap();
        let body = serde_json::to_value(&draft).unwrap();

        assert_eq!(body["shippingAddress"], "1 Main St");
        assert_eq!(body["orderNotes"], "ring the bell");
        assert_eq!(body["items"][0]["productId"], "p2");
        assert_eq!(body["items"][0]["quantity"], 2);
        // The path product id is routing detail, not body payload.
        assert!(body.get("primaryProductId").is_none());
    }

    #[test]
    fn order_lists_decode_bare_and_wrapped() {
        let bare: OrderListPayload =
            serde_json::from_str(r#"[{"_id": "o1", "status": "shipped"}]"#).unwrap();
        assert_eq!(bare.into_orders()[0].status, OrderStatus::Shipped);

        let wrapped: OrderListPayload =
            serde_json::from_str(r#"{"orders": [{"id": "o2"}]}"#).unwrap();
        let orders = wrapped.into_orders();
        assert_eq!(orders[0].id.as_str(), "o2");
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    #[test]
    fn fetched_orders_tolerate_sparse_lines() {
        let order: Order = serde_json::from_str(
            r#"{
                "_id": "o3",
                "items": [
                    {"productId": "p1", "price": 12.5, "quantity": 2},
                    {"name": "Sample"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(order.items[0].line_total().to_string(), "25.00");
        assert_eq!(order.items[1].display_name(), "Sample");
        assert_eq!(order.items[1].line_total().to_string(), "0.00");
        assert_eq!(order.total_amount().to_string(), "25.00");
    }
}
