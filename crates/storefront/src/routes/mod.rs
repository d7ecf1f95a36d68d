//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                    - Storefront page with product cards and cart widget
//! GET    /health              - Health check
//!
//! # Cart widget (HTMX fragments)
//! POST   /cart/events         - Delegated widget event (returns out-of-band fragments)
//! GET    /cart/badge          - Cart icon with count badge (fragment)
//! DELETE /cart/notices/{id}   - Forget a self-dismissed notice
//! ```

pub mod cart;
pub mod home;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(cart::dispatch))
        .route("/badge", get(cart::badge))
        .route("/notices/{id}", delete(cart::dismiss_notice))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Cart widget routes
        .nest("/cart", cart_routes())
}
