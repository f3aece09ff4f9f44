//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (DB ping)
//!
//! # Catalog
//! GET    /api/products             - Product listing
//! POST   /api/products             - Create or update product (admin)
//! DELETE /api/products?id=         - Delete product (admin)
//!
//! # Cart
//! POST /api/cart/hydrate           - Resolve saved pairs into cart lines
//!
//! # Orders
//! POST /api/orders                 - Checkout
//! POST /api/orders/track           - OTP-verified order lookup
//! GET  /api/admin/orders           - All orders (admin)
//! POST /api/admin/orders/status    - Overwrite order status (admin)
//!
//! # Addresses
//! GET    /api/addresses?email=     - List a user's addresses
//! POST   /api/addresses            - Create or update address
//! DELETE /api/addresses/{id}?email= - Delete address
//!
//! # OTP
//! POST /api/otp/send               - Issue tracking code (rate-limited)
//! POST /api/otp/verify             - Verify and consume a code
//!
//! # Shipping / Payments
//! POST /api/shipping/quote         - Cheapest courier rate (with fallback)
//! POST /api/payments/intent        - Register order with gateway
//! POST /api/payments/verify        - Verify payment, mark Paid
//!
//! # AI (admin)
//! POST /api/admin/ai/describe      - Generate product copy
//! POST /api/admin/ai/image         - Generate product image
//!
//! # Webhooks
//! POST /webhooks/payment           - Gateway confirmation (HMAC, hard reject)
//! POST /webhooks/shipping          - Carrier update (static token, lenient)
//! ```

pub mod addresses;
pub mod ai;
pub mod cart;
pub mod health;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod products;
pub mod shipping;
pub mod webhooks;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};

use crate::middleware::{otp_rate_limiter, require_admin};
use crate::state::AppState;

/// Routes under `/api/admin`, all behind the admin bearer token.
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::admin_index))
        .route("/orders/status", post(orders::admin_update_status))
        .route("/ai/describe", post(ai::describe))
        .route("/ai/image", post(ai::image))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Public API routes. The catalog path mixes a public GET with admin-gated
/// mutations on the same route.
fn api_routes(state: &AppState) -> Router<AppState> {
    let admin_gate = from_fn_with_state(state.clone(), require_admin);

    Router::new()
        .route(
            "/products",
            get(products::index).merge(
                post(products::upsert)
                    .delete(products::destroy)
                    .layer(admin_gate),
            ),
        )
        .route("/cart/hydrate", post(cart::hydrate))
        .route("/orders", post(orders::checkout))
        .route("/orders/track", post(orders::track))
        .route(
            "/addresses",
            get(addresses::index).post(addresses::upsert),
        )
        .route("/addresses/{id}", delete(addresses::destroy))
        .route(
            "/otp/send",
            post(otp::send).route_layer(otp_rate_limiter()),
        )
        .route("/otp/verify", post(otp::verify))
        .route("/shipping/quote", post(shipping::quote))
        .route("/payments/intent", post(payments::intent))
        .route("/payments/verify", post(payments::verify))
        .nest("/admin", admin_routes(state))
}

/// Webhook routes. No admin token; each handler enforces its own trust model.
fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/payment", post(webhooks::payment))
        .route("/shipping", post(webhooks::shipping))
}

/// Create all routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api_routes(state))
        .nest("/webhooks", webhook_routes())
}
