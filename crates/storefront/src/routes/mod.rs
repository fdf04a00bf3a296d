//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//!
//! # Products
//! GET  /products               - Product listing (?category= filter)
//! GET  /products/search        - Live search fragment (HTMX)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (requires auth; fragments via HTMX)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add product (returns count badge)
//! POST /cart/update            - Set line quantity (returns cart_items fragment)
//! POST /cart/remove            - Remove line, confirmed (returns cart_items fragment)
//! POST /cart/clear             - Empty the cart (returns cart_items fragment)
//! POST /cart/refresh           - Authoritative re-fetch (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment, 0 when signed out)
//!
//! # Checkout (requires auth)
//! GET  /checkout               - Shipping form + order summary
//! POST /checkout               - Create the order, redirect to /checkout/pay
//! GET  /checkout/pay           - Payment page for the pending order
//! POST /checkout/pay           - Initiate payment, redirect to the gateway
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action (then OTP verification)
//! GET  /auth/verify-otp        - OTP verification page
//! POST /auth/verify-otp        - OTP verification action
//! GET  /auth/forgot-password   - Forgot password page
//! POST /auth/forgot-password   - Request a reset email
//! GET  /auth/reset-password    - Reset page (?token= from the email link)
//! POST /auth/reset-password    - Set the new password
//! POST /auth/logout            - Logout action
//!
//! # Account (requires auth)
//! GET  /account                - Profile overview
//! GET  /account/orders         - Order history
//!
//! # Misc
//! GET  /contact                - Contact form
//! POST /contact                - Submit the contact form
//! POST /newsletter/subscribe   - Newsletter signup fragment (HTMX)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod newsletter;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/search", get(products::search))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/refresh", post(cart::refresh))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/pay", get(checkout::pay_page).post(checkout::pay))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route(
            "/verify-otp",
            get(auth::verify_otp_page).post(auth::verify_otp),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
        .route(
            "/reset-password",
            get(auth::reset_password_page).post(auth::reset_password),
        )
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/orders", get(account::orders))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .route("/contact", get(contact::show).post(contact::submit))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
}
