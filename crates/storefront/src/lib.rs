//! Storefront cart widget library.
//!
//! The widget is split the usual way: [`store`] owns the cart and its
//! persistence slot, [`view`] renders the badge, panel and notices, and
//! [`controller`] turns delegated page events into store mutations and view
//! refreshes. The [`routes`] module hosts the widget on a storefront page.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod content;
pub mod cookie_storage;
pub mod controller;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod view;

use axum::{Router, routing::get};
use tower_http::services::ServeDir;

use state::AppState;

/// Build the storefront router with sessions and static assets.
///
/// Requests of one session run one at a time.
///
/// `static_dir` is served under `/static`.
#[must_use]
pub fn app(state: AppState, static_dir: &std::path::Path) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(session_layer)
        .layer(axum::middleware::from_fn_with_state(
            middleware::SessionLocks::new(),
            middleware::session_lock_middleware,
        ))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running.
async fn health() -> &'static str {
    "ok"
}
