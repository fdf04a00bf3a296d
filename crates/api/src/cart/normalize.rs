//! Cart payload normalization.
//!
//! The cart endpoint has answered in three shapes over the API's lifetime: a
//! bare array of lines, `{"items": [...]}`, and `{"cart": {"items": [...]}}`.
//! All three normalize to the same ordered list of [`CartItem`]. A payload
//! matching none of them is a parse error, never a silently empty cart.
//!
//! Field resolution is "first non-empty of several aliases" per record. The
//! one rule with teeth: a record's own id is only ever display identity
//! (`line_id`); mutation identity (`product_id`) comes from the nested
//! product object or an explicit productId field, or it does not exist.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use velora_core::{CartLineId, Price, ProductId};

use crate::error::ApiError;

/// Name used when a cart line carries no name under any alias.
pub(crate) const FALLBACK_NAME: &str = "Unknown product";

// =============================================================================
// Canonical item
// =============================================================================

/// A cart line in the client's canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog product id. Required for any mutation; `None` makes the line
    /// display-only and checkout drops it.
    pub product_id: Option<ProductId>,
    /// Server-side line id; equals the product id when the API does not
    /// distinguish them, and may be empty when a record carried no id at all.
    pub line_id: CartLineId,
    pub name: String,
    pub price: Price,
    /// Always at least 1.
    pub quantity: u32,
    pub image: Option<String>,
    pub category: Option<String>,
}

impl CartItem {
    /// Whether `identity` addresses this line, by product id or line id.
    ///
    /// An empty line id never matches: a record that arrived with no id of
    /// any kind cannot be addressed.
    #[must_use]
    pub fn matches(&self, identity: &str) -> bool {
        if identity.is_empty() {
            return false;
        }
        if let Some(product_id) = &self.product_id
            && product_id.as_str() == identity
        {
            return true;
        }
        !self.line_id.as_str().is_empty() && self.line_id.as_str() == identity
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// Sum of line totals across `items`.
#[must_use]
pub fn subtotal(items: &[CartItem]) -> Price {
    items
        .iter()
        .fold(Price::ZERO, |acc, item| acc.saturating_add(item.line_total()))
}

// =============================================================================
// Payload shapes
// =============================================================================

/// The three known cart payload shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CartPayload {
    Bare(Vec<Value>),
    Items { items: Vec<Value> },
    Nested { cart: CartEnvelope },
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    items: Vec<Value>,
}

impl CartPayload {
    fn into_records(self) -> Vec<Value> {
        match self {
            Self::Bare(records) | Self::Items { items: records } => records,
            Self::Nested { cart } => cart.items,
        }
    }
}

/// Parse a cart response body into canonical items.
///
/// # Errors
///
/// [`ApiError::Decode`] when the body is not JSON at all, and
/// [`ApiError::UnexpectedPayload`] when it is JSON but matches none of the
/// three known shapes.
pub fn parse_cart_payload(body: &str) -> Result<Vec<CartItem>, ApiError> {
    let value: Value = serde_json::from_str(body)?;
    let payload: CartPayload = serde_json::from_value(value).map_err(|_| {
        ApiError::UnexpectedPayload(
            "cart response is neither an array, {items}, nor {cart:{items}}".to_string(),
        )
    })?;
    Ok(normalize_records(payload.into_records()))
}

/// Normalize raw records, preserving input order.
///
/// Records that are not JSON objects are dropped with a warning.
fn normalize_records(records: Vec<Value>) -> Vec<CartItem> {
    records
        .iter()
        .filter_map(|record| {
            let item = normalize_record(record);
            if item.is_none() {
                warn!(record = %record, "dropping non-object cart record");
            }
            item
        })
        .collect()
}

fn normalize_record(record: &Value) -> Option<CartItem> {
    let obj = record.as_object()?;

    let product = obj.get("product").filter(|v| v.is_object());

    // Mutation identity: nested product id, then an explicit productId field.
    // The record's own id is never promoted here.
    let product_id = product
        .and_then(|p| field(p, &["_id", "id"]))
        .and_then(id_string)
        .or_else(|| {
            obj.get("productId")
                .or_else(|| obj.get("product_id"))
                .and_then(id_string)
        })
        .map(ProductId::new);

    // Display identity: the record's own id, falling back to the product id
    // when the server does not issue separate line ids.
    let line_id = field(record, &["_id", "id"])
        .and_then(id_string)
        .or_else(|| product_id.as_ref().map(|id| id.as_str().to_string()))
        .map_or_else(|| CartLineId::new(""), CartLineId::new);

    let name = first_string(record, &["name", "title"])
        .or_else(|| product.and_then(|p| first_string(p, &["name", "title"])))
        .unwrap_or_else(|| FALLBACK_NAME.to_string());

    let price = resolve_price(record, product, &line_id);
    let quantity = resolve_quantity(record, &line_id);

    let image = first_string(record, &["image", "imageUrl"])
        .or_else(|| product.and_then(|p| first_string(p, &["image", "imageUrl"])));

    let category = first_string(record, &["category"])
        .or_else(|| product.and_then(|p| first_string(p, &["category"])));

    Some(CartItem {
        product_id,
        line_id,
        name,
        price,
        quantity,
        image,
        category,
    })
}

fn resolve_price(record: &Value, product: Option<&Value>, line_id: &CartLineId) -> Price {
    let raw = field(record, &["price"]).or_else(|| product.and_then(|p| field(p, &["price"])));
    let Some(raw) = raw else {
        return Price::ZERO;
    };
    let Some(amount) = decimal_value(raw) else {
        warn!(line_id = %line_id, raw = %raw, "unparsable price in cart payload, using 0");
        return Price::ZERO;
    };
    Price::new(amount).unwrap_or_else(|_| {
        warn!(line_id = %line_id, %amount, "negative price in cart payload, using 0");
        Price::ZERO
    })
}

fn resolve_quantity(record: &Value, line_id: &CartLineId) -> u32 {
    let raw = field(record, &["quantity", "qty"]);
    let Some(raw) = raw else {
        return 1;
    };
    let Some(quantity) = integer_value(raw) else {
        warn!(line_id = %line_id, raw = %raw, "unparsable quantity in cart payload, using 1");
        return 1;
    };
    if quantity < 1 {
        warn!(line_id = %line_id, quantity, "quantity below 1 in cart payload, using 1");
        return 1;
    }
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

// =============================================================================
// Value helpers
// =============================================================================

/// First present field among `names` on a JSON object.
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| value.get(name))
}

/// First non-empty string among `names`.
fn first_string(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| value.get(name))
        .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()))
        .map(String::from)
}

/// Ids arrive as strings or numbers; both become strings. Empty strings and
/// non-scalar values resolve to nothing.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A decimal from a JSON number or numeric string.
fn decimal_value(value: &Value) -> Option<Decimal> {
    serde_json::from_value(value.clone()).ok()
}

/// An integer from a JSON number or numeric string.
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn records() -> &'static str {
        r#"[
            {"_id": "line1", "product": {"_id": "p1", "name": "Dew Serum"}, "price": 28, "quantity": 2},
            {"_id": "line2", "productId": "p2", "name": "Night Cream", "price": "34.50", "qty": 1}
        ]"#
    }

    #[test]
    fn three_shapes_normalize_identically() {
        let bare = parse_cart_payload(records()).unwrap();
        let items = parse_cart_payload(&format!(r#"{{"items": {}}}"#, records())).unwrap();
        let nested =
            parse_cart_payload(&format!(r#"{{"cart": {{"items": {}}}}}"#, records())).unwrap();

        assert_eq!(bare, items);
        assert_eq!(bare, nested);
        assert_eq!(bare.len(), 2);
    }

    #[test]
    fn ordering_matches_input() {
        let items = parse_cart_payload(records()).unwrap();
        assert_eq!(items.first().unwrap().line_id, CartLineId::new("line1"));
        assert_eq!(items.get(1).unwrap().line_id, CartLineId::new("line2"));
    }

    #[test]
    fn nested_product_id_wins_over_direct_field() {
        let body = r#"[{"_id": "l1", "product": {"id": "nested"}, "productId": "direct"}]"#;
        let items = parse_cart_payload(body).unwrap();
        assert_eq!(
            items.first().unwrap().product_id,
            Some(ProductId::new("nested"))
        );
    }

    #[test]
    fn own_id_is_never_mutation_identity() {
        let body = r#"[{"_id": "only-own-id", "name": "Mystery"}]"#;
        let items = parse_cart_payload(body).unwrap();
        let item = items.first().unwrap();
        assert_eq!(item.product_id, None);
        assert_eq!(item.line_id, CartLineId::new("only-own-id"));
    }

    #[test]
    fn line_id_falls_back_to_product_id() {
        let body = r#"[{"productId": "p9", "name": "Toner"}]"#;
        let items = parse_cart_payload(body).unwrap();
        let item = items.first().unwrap();
        assert_eq!(item.product_id, Some(ProductId::new("p9")));
        assert_eq!(item.line_id, CartLineId::new("p9"));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let body = r#"[{"id": 42, "productId": 7}]"#;
        let items = parse_cart_payload(body).unwrap();
        let item = items.first().unwrap();
        assert_eq!(item.product_id, Some(ProductId::new("7")));
        assert_eq!(item.line_id, CartLineId::new("42"));
    }

    #[test]
    fn defaults_apply_for_missing_fields() {
        let body = r#"[{"_id": "l1"}]"#;
        let item = parse_cart_payload(body).unwrap().into_iter().next().unwrap();
        assert_eq!(item.name, "Unknown product");
        assert_eq!(item.price, Price::ZERO);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.image, None);
        assert_eq!(item.category, None);
    }

    #[test]
    fn invalid_price_and_quantity_degrade() {
        let body = r#"[{"_id": "l1", "price": -4, "quantity": 0},
                       {"_id": "l2", "price": "soon", "quantity": "many"}]"#;
        let items = parse_cart_payload(body).unwrap();
        for item in &items {
            assert_eq!(item.price, Price::ZERO);
            assert_eq!(item.quantity, 1);
        }
    }

    #[test]
    fn nested_product_supplies_name_price_image_category() {
        let body = r#"[{"_id": "l1", "product": {
            "_id": "p1", "name": "Glow Oil", "price": 19.5,
            "imageUrl": "/img/oil.jpg", "category": "oil"
        }, "quantity": 3}]"#;
        let item = parse_cart_payload(body).unwrap().into_iter().next().unwrap();
        assert_eq!(item.name, "Glow Oil");
        assert_eq!(item.price.to_string(), "19.50");
        assert_eq!(item.image.as_deref(), Some("/img/oil.jpg"));
        assert_eq!(item.category.as_deref(), Some("oil"));
        assert_eq!(item.line_total(), Price::new(Decimal::new(585, 1)).unwrap());
    }

    #[test]
    fn own_fields_win_over_nested_product() {
        let body = r#"[{"_id": "l1", "name": "Own Name", "price": 10,
                        "product": {"_id": "p1", "name": "Nested", "price": 99}}]"#;
        let item = parse_cart_payload(body).unwrap().into_iter().next().unwrap();
        assert_eq!(item.name, "Own Name");
        assert_eq!(item.price.to_string(), "10.00");
    }

    #[test]
    fn non_object_records_are_dropped() {
        let body = r#"[{"_id": "l1"}, 17, "noise", null, {"_id": "l2"}]"#;
        let items = parse_cart_payload(body).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn empty_known_shapes_are_empty_carts() {
        assert!(parse_cart_payload("[]").unwrap().is_empty());
        assert!(parse_cart_payload(r#"{"items": []}"#).unwrap().is_empty());
        assert!(
            parse_cart_payload(r#"{"cart": {"items": []}}"#)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn unknown_shapes_are_parse_errors() {
        let err = parse_cart_payload(r#"{"lines": []}"#).unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload(_)));

        let err = parse_cart_payload(r#""just a string""#).unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedPayload(_)));
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let err = parse_cart_payload("{not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn matches_by_product_id_or_line_id() {
        let item = parse_cart_payload(records())
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        assert!(item.matches("p1"));
        assert!(item.matches("line1"));
        assert!(!item.matches("p2"));
        assert!(!item.matches(""));
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let items = parse_cart_payload(records()).unwrap();
        // 28 * 2 + 34.50 * 1
        assert_eq!(subtotal(&items).to_string(), "90.50");
    }
}
