//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use crate::content::ProductCard;
use crate::controller::CartController;
use crate::error::{AppError, Result};
use crate::routes::cart::{load_slot, save_view_state};
use crate::state::AppState;
use crate::view::Region;

/// Storefront page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductCard>,
    /// Pre-rendered cart icon.
    pub badge: String,
    /// Pre-rendered panel, if the panel already exists.
    pub panel: Option<String>,
}

/// Display the storefront page and mount the cart widget.
///
/// A page load starts a fresh widget: the cart is hydrated from the
/// browser's slot, while panel and notices start over.
#[instrument(skip(state, session, headers))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let config = &state.config().widget;
    let storage = load_slot(&session, &headers, &config.storage_key).await;
    let widget = CartController::mount(storage, config);
    save_view_state(&session, widget.view().state()).await?;

    let mut badge = None;
    let mut panel = None;
    for fragment in widget.render_page()? {
        match fragment.region {
            Region::Badge => badge = Some(fragment.html),
            Region::Panel => panel = Some(fragment.html),
            Region::Notice(_) => {}
        }
    }
    let badge = badge.ok_or_else(|| AppError::Internal("cart badge not rendered".to_string()))?;

    Ok(HomeTemplate {
        products: state.content().products().to_vec(),
        badge,
        panel,
    })
}
