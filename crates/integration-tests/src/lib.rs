//! In-process stand-in for the remote Velora REST API.
//!
//! Tests drive the real [`ApiClient`] (and the storefront router on top of
//! it) over real HTTP against [`MockApi`], which binds an ephemeral port per
//! test. Consistency behaviour is scripted: quantity updates can be made to
//! fail, and removals can stay visible to reads for a configured number of
//! fetches, which is the read-after-write gap the cart reconciliation logic
//! exists to absorb. Call counters expose how much traffic an operation
//! actually generated.
//!
//! Accepted bearer tokens are fixed ([`SHOPPER_TOKEN`], [`ADMIN_TOKEN`]);
//! anything else gets a 401. The login endpoint accepts [`PASSWORD`] for any
//! email and issues the admin token when the address starts with `admin@`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

use velora_api::ApiClient;
use velora_core::BearerToken;

/// Token the login endpoint issues to shoppers.
pub const SHOPPER_TOKEN: &str = "tok-shopper";
/// Token the login endpoint issues to `admin@` addresses.
pub const ADMIN_TOKEN: &str = "tok-admin";
/// The one password the login endpoint accepts.
pub const PASSWORD: &str = "glow-getter";

/// How `GET /api/carts` wraps the line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartShape {
    /// A bare array of line records.
    #[default]
    Bare,
    /// `{"items": [...]}`
    Items,
    /// `{"cart": {"items": [...]}}`
    Nested,
}

/// A removal the clear endpoint has acknowledged but reads do not yet show.
#[derive(Debug)]
struct PendingRemoval {
    product_id: String,
    /// Fetches that will still serve the line before it drops out.
    visible_for: u32,
}

struct MockState {
    products: Mutex<Vec<Value>>,
    cart: Mutex<Vec<Value>>,
    cart_shape: Mutex<CartShape>,
    /// When set, `GET /api/carts` serves this literal body instead of the
    /// seeded records. For driving unknown-shape payloads through HTTP.
    cart_body_override: Mutex<Option<String>>,
    pending_removal: Mutex<Option<PendingRemoval>>,
    /// Fetches a removal stays visible for before reads reflect it.
    removal_lag: AtomicU32,
    /// When set, quantity updates fail with a 400 carrying this message.
    fail_update: Mutex<Option<String>>,
    /// When set, every authenticated endpoint answers 401, as if the
    /// token had been invalidated server-side.
    revoked: AtomicBool,
    orders: Mutex<Vec<Value>>,
    cart_fetches: AtomicU32,
    quantity_updates: AtomicU32,
    removals: AtomicU32,
    order_posts: AtomicU32,
    views: AtomicU64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            products: Mutex::new(default_catalog()),
            cart: Mutex::new(Vec::new()),
            cart_shape: Mutex::new(CartShape::Bare),
            cart_body_override: Mutex::new(None),
            pending_removal: Mutex::new(None),
            removal_lag: AtomicU32::new(0),
            fail_update: Mutex::new(None),
            revoked: AtomicBool::new(false),
            orders: Mutex::new(Vec::new()),
            cart_fetches: AtomicU32::new(0),
            quantity_updates: AtomicU32::new(0),
            removals: AtomicU32::new(0),
            order_posts: AtomicU32::new(0),
            views: AtomicU64::new(0),
        }
    }
}

fn default_catalog() -> Vec<Value> {
    vec![
        json!({"_id": "p1", "name": "Dew Serum", "description": "Hyaluronic acid serum.",
               "price": 28, "category": "serum", "stock": 12}),
        json!({"_id": "p2", "name": "Gentle Cleanser", "description": "Low-pH gel cleanser.",
               "price": 19, "category": "cleanser", "stock": 30}),
        json!({"_id": "p3", "name": "Cloud Cream", "description": "Barrier repair cream.",
               "price": 34, "category": "moisturizer", "stock": 8}),
    ]
}

/// A poisoned lock in the mock only means an earlier assertion panicked;
/// carrying on with the inner value keeps the failure readable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_product_id(record: &Value) -> Option<&str> {
    record.get("productId").and_then(Value::as_str)
}

// =============================================================================
// MockApi
// =============================================================================

/// A scripted, in-process rendition of the remote API.
pub struct MockApi {
    base_url: Url,
    state: Arc<MockState>,
}

impl MockApi {
    /// Bind an ephemeral port and start serving. The server task dies with
    /// the test's runtime; there is nothing to shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(%error, "mock API server stopped");
            }
        });

        let base_url = Url::parse(&format!("http://{addr}"))
            .map_err(|_| std::io::Error::other("listener address did not form a URL"))?;
        Ok(Self { base_url, state })
    }

    /// The URL the mock is listening on.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// A real [`ApiClient`] pointed at the mock.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url)
    }

    /// The token the mock accepts for shopper endpoints.
    #[must_use]
    pub fn shopper_token() -> BearerToken {
        BearerToken::new(SHOPPER_TOKEN)
    }

    /// The token the mock accepts for admin endpoints.
    #[must_use]
    pub fn admin_token() -> BearerToken {
        BearerToken::new(ADMIN_TOKEN)
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Replace the catalog with `records` (a JSON array).
    pub fn seed_products(&self, records: &Value) {
        *lock(&self.state.products) = records.as_array().cloned().unwrap_or_default();
    }

    /// Replace the cart with `records` (a JSON array of line records).
    pub fn seed_cart(&self, records: &Value) {
        *lock(&self.state.cart) = records.as_array().cloned().unwrap_or_default();
    }

    /// Choose how `GET /api/carts` wraps the records.
    pub fn set_cart_shape(&self, shape: CartShape) {
        *lock(&self.state.cart_shape) = shape;
    }

    /// Serve this literal body from `GET /api/carts` instead of the records.
    pub fn override_cart_body(&self, body: &str) {
        *lock(&self.state.cart_body_override) = Some(body.to_string());
    }

    /// Make every quantity update fail with a 400 carrying `message`.
    pub fn fail_quantity_updates(&self, message: &str) {
        *lock(&self.state.fail_update) = Some(message.to_string());
    }

    /// Removals acknowledged from now on stay visible to reads for
    /// `fetches` fetches. `u32::MAX` never converges within any sane poll
    /// budget.
    pub fn set_removal_lag(&self, fetches: u32) {
        self.state.removal_lag.store(fetches, Ordering::SeqCst);
    }

    /// Invalidate every token: authenticated endpoints answer 401 from now
    /// on, as a server-side session purge would.
    pub fn revoke_tokens(&self) {
        self.state.revoked.store(true, Ordering::SeqCst);
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Number of `GET /api/carts` calls so far.
    #[must_use]
    pub fn cart_fetches(&self) -> u32 {
        self.state.cart_fetches.load(Ordering::SeqCst)
    }

    /// Number of quantity update calls so far.
    #[must_use]
    pub fn quantity_updates(&self) -> u32 {
        self.state.quantity_updates.load(Ordering::SeqCst)
    }

    /// Number of removal/clear calls so far.
    #[must_use]
    pub fn removals(&self) -> u32 {
        self.state.removals.load(Ordering::SeqCst)
    }

    /// Number of order creation calls so far.
    #[must_use]
    pub fn order_posts(&self) -> u32 {
        self.state.order_posts.load(Ordering::SeqCst)
    }

    /// The cart as the server currently stores it, pending removals
    /// unapplied.
    #[must_use]
    pub fn server_cart(&self) -> Vec<Value> {
        lock(&self.state.cart).clone()
    }

    /// Every order creation body received, in arrival order.
    #[must_use]
    pub fn orders_received(&self) -> Vec<Value> {
        lock(&self.state.orders).clone()
    }

    /// Zero the call counters. Useful after a setup phase so assertions
    /// count only the operation under test.
    pub fn reset_counters(&self) {
        self.state.cart_fetches.store(0, Ordering::SeqCst);
        self.state.quantity_updates.store(0, Ordering::SeqCst);
        self.state.removals.store(0, Ordering::SeqCst);
        self.state.order_posts.store(0, Ordering::SeqCst);
    }
}

// =============================================================================
// Router and handlers
// =============================================================================

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(show_product))
        .route("/api/carts", get(fetch_cart))
        .route("/api/carts/add/{id}", post(add_to_cart))
        .route("/api/carts/update/{id}", put(update_quantity))
        .route("/api/carts/clear", delete(clear_cart))
        .route("/api/orders/{id}", post(create_order))
        .route("/api/views/count", get(count_views))
        .with_state(state)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Authentication required"})),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"message": message}))).into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"message": message}))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    if state.revoked.load(Ordering::SeqCst) {
        return Err(unauthorized());
    }
    match bearer(headers) {
        Some(SHOPPER_TOKEN | ADMIN_TOKEN) => Ok(()),
        _ => Err(unauthorized()),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if password != PASSWORD {
        return unauthorized();
    }

    let (token, role) = if email.starts_with("admin@") {
        (ADMIN_TOKEN, "admin")
    } else {
        (SHOPPER_TOKEN, "user")
    };
    Json(json!({"token": token, "user": {"email": email, "role": role}})).into_response()
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    Json(json!({"user": {"name": "Test Shopper", "email": "shopper@velora.test", "role": "user"}}))
        .into_response()
}

async fn list_products(State(state): State<Arc<MockState>>) -> Response {
    Json(Value::Array(lock(&state.products).clone())).into_response()
}

async fn show_product(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let products = lock(&state.products);
    products
        .iter()
        .find(|record| record.get("_id").and_then(Value::as_str) == Some(id.as_str()))
        .map_or_else(
            || not_found("Product not found"),
            |record| Json(record.clone()).into_response(),
        )
}

async fn fetch_cart(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    state.cart_fetches.fetch_add(1, Ordering::SeqCst);

    if let Some(body) = lock(&state.cart_body_override).clone() {
        return ([(header::CONTENT_TYPE, "application/json")], body).into_response();
    }

    let records = {
        let mut cart = lock(&state.cart);
        let mut pending = lock(&state.pending_removal);
        if let Some(removal) = pending.as_mut() {
            if removal.visible_for == 0 {
                let target = removal.product_id.clone();
                cart.retain(|record| record_product_id(record) != Some(target.as_str()));
                *pending = None;
            } else {
                removal.visible_for -= 1;
            }
        }
        cart.clone()
    };

    let payload = match *lock(&state.cart_shape) {
        CartShape::Bare => Value::Array(records),
        CartShape::Items => json!({"items": records}),
        CartShape::Nested => json!({"cart": {"items": records}}),
    };
    Json(payload).into_response()
}

async fn add_to_cart(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let added = body.get("quantity").and_then(Value::as_u64).unwrap_or(1);

    let (name, price) = {
        let products = lock(&state.products);
        products
            .iter()
            .find(|record| record.get("_id").and_then(Value::as_str) == Some(id.as_str()))
            .map_or_else(
                || ("Unknown".to_string(), json!(10)),
                |record| {
                    (
                        record
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown")
                            .to_string(),
                        record.get("price").cloned().unwrap_or_else(|| json!(10)),
                    )
                },
            )
    };

    let mut cart = lock(&state.cart);
    if let Some(existing) = cart
        .iter_mut()
        .find(|record| record_product_id(record) == Some(id.as_str()))
    {
        let quantity = existing
            .get("quantity")
            .and_then(Value::as_u64)
            .unwrap_or(1)
            .saturating_add(added);
        if let Some(object) = existing.as_object_mut() {
            object.insert("quantity".to_string(), json!(quantity));
        }
    } else {
        cart.push(json!({
            "_id": id, "productId": id, "name": name, "price": price, "quantity": added
        }));
    }
    Json(json!({"message": "Added to cart"})).into_response()
}

async fn update_quantity(
    State(state): State<Arc<MockState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    state.quantity_updates.fetch_add(1, Ordering::SeqCst);

    if let Some(message) = lock(&state.fail_update).clone() {
        return bad_request(&message);
    }

    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(1);
    let mut cart = lock(&state.cart);
    let mut found = false;
    for record in cart.iter_mut() {
        if record_product_id(record) == Some(id.as_str()) {
            if let Some(object) = record.as_object_mut() {
                object.insert("quantity".to_string(), json!(quantity));
            }
            found = true;
        }
    }
    if found {
        Json(json!({"message": "Cart updated"})).into_response()
    } else {
        not_found("Product not in cart")
    }
}

/// `DELETE /api/carts/clear`: with a `{"productId"}` body, acknowledge a
/// single-line removal that reads will reflect only after the configured
/// lag; without a body, empty the cart immediately.
async fn clear_cart(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    state.removals.fetch_add(1, Ordering::SeqCst);

    let product_id = serde_json::from_slice::<Value>(&body).ok().and_then(|value| {
        value
            .get("productId")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    match product_id {
        Some(product_id) => {
            let visible_for = state.removal_lag.load(Ordering::SeqCst);
            *lock(&state.pending_removal) = Some(PendingRemoval {
                product_id,
                visible_for,
            });
            Json(json!({"message": "Item removed"})).into_response()
        }
        None => {
            lock(&state.cart).clear();
            *lock(&state.pending_removal) = None;
            Json(json!({"message": "Cart cleared"})).into_response()
        }
    }
}

async fn create_order(
    State(state): State<Arc<MockState>>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorize(&state, &headers) {
        return denied;
    }
    let count = state.order_posts.fetch_add(1, Ordering::SeqCst) + 1;
    lock(&state.orders).push(body);
    Json(json!({"_id": format!("order-{count}")})).into_response()
}

async fn count_views(State(state): State<Arc<MockState>>) -> Response {
    let count = state.views.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"count": count})).into_response()
}
