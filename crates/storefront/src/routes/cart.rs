//! Cart route handlers.
//!
//! Every widget interaction posts to one delegated endpoint. The handler
//! rehydrates the widget from the browser's session, dispatches the event,
//! writes the cart slot and UI state back, and answers with HTMX
//! out-of-band fragments for the regions that changed.

use axum::{
    Form,
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use crate::config::StorefrontConfig;
use crate::controller::{CartController, CartEvent, EventForm, Refresh};
use crate::cookie_storage::CookieStorage;
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::state::AppState;
use crate::view::{Fragment, NoticeId, ViewState};

/// HTMX event the page turns into a blocking `alert()`.
pub const ALERT_EVENT: &str = "cart-alert";

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart slot for this browser.
///
/// The copy written by the latest event wins; otherwise the browser's cookie
/// is read. A session copy that cannot be read falls back to the cookie.
pub async fn load_slot(session: &Session, headers: &HeaderMap, key: &str) -> CookieStorage {
    match session.get::<String>(session_keys::CART_SLOT).await {
        Ok(Some(raw)) => return CookieStorage::with_value(key, raw),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read cart slot from session: {e}"),
    }
    CookieStorage::from_headers(headers, key)
}

/// Record a written cart slot in the session and return its cookie.
async fn save_slot(
    session: &Session,
    storage: &CookieStorage,
    secure: bool,
) -> Result<Option<HeaderValue>> {
    let Some(raw) = storage.written() else {
        return Ok(None);
    };
    session.insert(session_keys::CART_SLOT, raw).await?;
    Ok(storage.set_cookie(secure))
}

/// Get the widget's UI state for the current page load.
async fn load_view_state(session: &Session) -> ViewState {
    match session.get::<ViewState>(session_keys::CART_VIEW).await {
        Ok(state) => state.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("Failed to read cart view state: {e}");
            ViewState::default()
        }
    }
}

/// Save the widget's UI state.
pub async fn save_view_state(session: &Session, state: &ViewState) -> Result<()> {
    session.insert(session_keys::CART_VIEW, state).await?;
    Ok(())
}

/// Resume the widget for this browser.
async fn resume_widget(
    session: &Session,
    headers: &HeaderMap,
    config: &StorefrontConfig,
) -> CartController<CookieStorage> {
    let storage = load_slot(session, headers, &config.widget.storage_key).await;
    let view_state = load_view_state(session).await;
    CartController::resume(storage, view_state, &config.widget)
}

// =============================================================================
// Responses
// =============================================================================

/// Wrap each fragment in an out-of-band swap targeting its region's slot.
#[must_use]
pub fn oob_fragments(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|fragment| {
            let swap = if fragment.region.appends() {
                "beforeend"
            } else {
                "innerHTML"
            };
            format!(
                r##"<div hx-swap-oob="{swap}:#{slot}">{html}</div>"##,
                slot = fragment.region.slot(),
                html = fragment.html
            )
        })
        .collect()
}

/// Build the HTMX response for a refresh.
fn refresh_response(refresh: &Refresh, set_cookie: Option<HeaderValue>) -> Response {
    let mut response = Html(oob_fragments(&refresh.fragments)).into_response();

    if let Some(cookie) = set_cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    if let Some(message) = &refresh.alert {
        let trigger = serde_json::json!({ ALERT_EVENT: { "message": message } }).to_string();
        match HeaderValue::from_str(&trigger) {
            Ok(value) => {
                response.headers_mut().insert("hx-trigger", value);
            }
            Err(e) => tracing::warn!("Failed to encode cart alert header: {e}"),
        }
    }

    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Dispatch a delegated widget event (HTMX).
#[instrument(skip(state, session, headers))]
pub async fn dispatch(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<EventForm>,
) -> Result<Response> {
    let event = CartEvent::try_from(form)?;
    let config = state.config();

    let mut widget = resume_widget(&session, &headers, config).await;
    let refresh = widget.dispatch(event, Utc::now())?;

    let (store, view) = widget.into_parts();
    save_view_state(&session, view.state()).await?;
    let set_cookie = save_slot(&session, store.storage(), config.is_secure()).await?;

    Ok(refresh_response(&refresh, set_cookie))
}

/// Forget a notice the page has removed.
///
/// Only the UI state changes; the cart slot is left alone.
#[instrument(skip(state, session, headers))]
pub async fn dismiss_notice(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<StatusCode> {
    let Path(id) = path.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let mut widget = resume_widget(&session, &headers, state.config()).await;
    widget.dispatch(CartEvent::DismissNotice(NoticeId::new(id)), Utc::now())?;

    let (_, view) = widget.into_parts();
    save_view_state(&session, view.state()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the cart icon with its count badge (fragment).
#[instrument(skip(state, session, headers))]
pub async fn badge(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let widget = resume_widget(&session, &headers, state.config()).await;
    let fragment = widget.view().render_badge(widget.store().count())?;
    Ok(Html(fragment.html))
}
