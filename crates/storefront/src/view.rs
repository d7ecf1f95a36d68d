//! Cart view: the badge, the panel, and transient notices.
//!
//! The view renders each page region it owns into an HTML [`Fragment`] and
//! tracks the little UI state the widget has: whether the panel has been
//! created and is open, and which notices are still on screen. Controls are
//! rendered with `data-action` / `data-id` attributes only; the page binds a
//! single delegated listener that turns those into
//! [`CartEvent`](crate::controller::CartEvent)s.

use std::time::Duration;

use askama::Template;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart_core::{CartState, LineItem, LineItemId};

storefront_cart_core::define_id!(NoticeId);

/// A page region the widget writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// The cart icon and its count badge.
    Badge,
    /// The cart panel.
    Panel,
    /// One transient notice in the notice stack.
    Notice(NoticeId),
}

impl Region {
    /// DOM id of the page element that holds this region.
    #[must_use]
    pub const fn slot(&self) -> &'static str {
        match self {
            Self::Badge => "cart-badge-slot",
            Self::Panel => "cart-panel-slot",
            Self::Notice(_) => "cart-notices",
        }
    }

    /// Whether the fragment replaces the slot's contents or is appended to it.
    #[must_use]
    pub const fn appends(&self) -> bool {
        matches!(self, Self::Notice(_))
    }
}

/// Rendered HTML for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub region: Region,
    pub html: String,
}

/// Panel visibility once the panel exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelVisibility {
    Open,
    Closed,
}

/// A notice still on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: NoticeId,
    pub text: String,
    pub expires_at: DateTime<Utc>,
}

/// UI state of the widget for one page load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    /// `None` until the panel is first opened.
    panel: Option<PanelVisibility>,
    notices: Vec<Notice>,
    next_notice_id: i64,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart icon with count badge.
#[derive(Template)]
#[template(path = "cart/badge.html")]
struct BadgeTemplate {
    count: u32,
}

/// One row of the cart panel.
struct PanelRow {
    id: LineItemId,
    name: String,
    image_url: String,
    price: String,
    quantity: u32,
}

impl From<&LineItem> for PanelRow {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            price: item.price.to_string(),
            quantity: item.quantity,
        }
    }
}

/// Cart panel with rows, total and actions.
#[derive(Template)]
#[template(path = "cart/panel.html")]
struct PanelTemplate {
    open: bool,
    rows: Vec<PanelRow>,
    total: String,
}

/// A self-dismissing notice.
#[derive(Template)]
#[template(path = "cart/notice.html")]
struct NoticeTemplate<'a> {
    id: NoticeId,
    text: &'a str,
    dismiss_after_ms: u64,
}

// =============================================================================
// View
// =============================================================================

/// Renderer and UI state for the cart widget.
#[derive(Debug, Clone)]
pub struct CartView {
    state: ViewState,
    notice_duration: Duration,
}

impl CartView {
    /// A fresh view: no panel yet, no notices.
    #[must_use]
    pub fn new(notice_duration: Duration) -> Self {
        Self::restore(ViewState::default(), notice_duration)
    }

    /// Resume a view from state saved earlier in the same page load.
    #[must_use]
    pub const fn restore(state: ViewState, notice_duration: Duration) -> Self {
        Self {
            state,
            notice_duration,
        }
    }

    /// The UI state, for saving between events.
    #[must_use]
    pub const fn state(&self) -> &ViewState {
        &self.state
    }

    /// Panel visibility, or `None` if the panel was never created.
    #[must_use]
    pub const fn panel(&self) -> Option<PanelVisibility> {
        self.state.panel
    }

    /// Whether the panel exists and is open.
    #[must_use]
    pub fn is_panel_visible(&self) -> bool {
        self.state.panel == Some(PanelVisibility::Open)
    }

    /// Notices currently on screen, oldest first.
    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.state.notices
    }

    /// Render the cart icon; the badge is present only when `count > 0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render_badge(&self, count: u32) -> askama::Result<Fragment> {
        Ok(Fragment {
            region: Region::Badge,
            html: BadgeTemplate { count }.render()?,
        })
    }

    /// Render the panel for `cart`, or `None` if the panel was never created.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn render_panel(&self, cart: &CartState) -> askama::Result<Option<Fragment>> {
        let Some(visibility) = self.state.panel else {
            return Ok(None);
        };

        let template = PanelTemplate {
            open: visibility == PanelVisibility::Open,
            rows: cart.items().iter().map(PanelRow::from).collect(),
            total: cart.total().to_string(),
        };

        Ok(Some(Fragment {
            region: Region::Panel,
            html: template.render()?,
        }))
    }

    /// Queue a notice that dismisses itself after the configured duration.
    ///
    /// Notices stack; showing one never replaces another.
    ///
    /// # Errors
    ///
    /// Returns an error if the template fails to render.
    pub fn show_transient_message(
        &mut self,
        text: &str,
        now: DateTime<Utc>,
    ) -> askama::Result<Fragment> {
        self.state.next_notice_id = self.state.next_notice_id.saturating_add(1);
        let id = NoticeId::new(self.state.next_notice_id);

        let lifetime = TimeDelta::from_std(self.notice_duration).unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let html = NoticeTemplate {
            id,
            text,
            dismiss_after_ms: u64::try_from(self.notice_duration.as_millis()).unwrap_or(u64::MAX),
        }
        .render()?;

        self.state.notices.push(Notice {
            id,
            text: text.to_string(),
            expires_at,
        });

        Ok(Fragment {
            region: Region::Notice(id),
            html,
        })
    }

    /// Drop a notice the page has removed. Returns whether it was on screen.
    pub fn dismiss_notice(&mut self, id: NoticeId) -> bool {
        let before = self.state.notices.len();
        self.state.notices.retain(|notice| notice.id != id);
        self.state.notices.len() != before
    }

    /// Drop every notice whose display time has elapsed, returning their ids.
    pub fn expire_notices(&mut self, now: DateTime<Utc>) -> Vec<NoticeId> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.state.notices)
            .into_iter()
            .partition(|notice| notice.expires_at <= now);
        self.state.notices = live;
        expired.into_iter().map(|notice| notice.id).collect()
    }

    /// Flip panel visibility, creating the panel on first use.
    pub fn toggle_panel(&mut self) -> PanelVisibility {
        let next = match self.state.panel {
            Some(PanelVisibility::Open) => PanelVisibility::Closed,
            Some(PanelVisibility::Closed) | None => PanelVisibility::Open,
        };
        self.state.panel = Some(next);
        next
    }

    /// Close the panel if it is open. Returns whether anything changed.
    pub fn close_panel(&mut self) -> bool {
        if self.is_panel_visible() {
            self.state.panel = Some(PanelVisibility::Closed);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use storefront_cart_core::ProductDescriptor;

    const THREE_SECONDS: Duration = Duration::from_secs(3);

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn cart_with(products: &[(&str, &str)]) -> CartState {
        let mut cart = CartState::new();
        for (i, (name, price)) in products.iter().enumerate() {
            let product = ProductDescriptor::from_card(*name, price, format!("/img/{i}.png"));
            cart.add(&product, at(1_000 + i64::try_from(i).unwrap()));
        }
        cart
    }

    #[test]
    fn test_badge_shows_count() {
        let view = CartView::new(THREE_SECONDS);
        let fragment = view.render_badge(3).unwrap();
        assert_eq!(fragment.region, Region::Badge);
        assert!(fragment.html.contains(r#"data-count="3""#));
        assert!(fragment.html.contains(r#"data-action="toggle""#));
    }

    #[test]
    fn test_badge_absent_for_empty_cart() {
        let view = CartView::new(THREE_SECONDS);
        let fragment = view.render_badge(0).unwrap();
        assert!(!fragment.html.contains("data-count"));
        assert!(fragment.html.contains(r#"id="cart-icon""#));
    }

    #[test]
    fn test_panel_is_created_lazily() {
        let mut view = CartView::new(THREE_SECONDS);
        assert_eq!(view.panel(), None);
        assert!(view.render_panel(&CartState::new()).unwrap().is_none());

        assert_eq!(view.toggle_panel(), PanelVisibility::Open);
        assert!(view.render_panel(&CartState::new()).unwrap().is_some());
    }

    #[test]
    fn test_empty_panel() {
        let mut view = CartView::new(THREE_SECONDS);
        view.toggle_panel();
        let html = view.render_panel(&CartState::new()).unwrap().unwrap().html;

        assert!(html.contains("Your cart is empty"));
        assert!(html.contains("<span>0.00</span>"));
        assert!(!html.contains("cart-item\""));
    }

    #[test]
    fn test_panel_rows_and_total() {
        let mut view = CartView::new(THREE_SECONDS);
        view.toggle_panel();
        let cart = cart_with(&[("Sneaker A", "$49.99"), ("Sock", "$5.5")]);
        let html = view.render_panel(&cart).unwrap().unwrap().html;

        assert!(html.contains("<h4>Sneaker A</h4>"));
        assert!(html.contains("$49.99"));
        assert!(html.contains("$5.50"));
        assert!(html.contains("<span>55.49</span>"));
        assert!(html.contains(r#"data-action="increment" data-id="1000""#));
        assert!(html.contains(r#"data-action="decrement" data-id="1001""#));
        assert!(html.contains(r#"data-action="remove" data-id="1001""#));
        assert!(!html.contains("Your cart is empty"));
    }

    #[test]
    fn test_panel_escapes_names() {
        let mut view = CartView::new(THREE_SECONDS);
        view.toggle_panel();
        let cart = cart_with(&[("<script>x</script>", "$1")]);
        let html = view.render_panel(&cart).unwrap().unwrap().html;
        assert!(!html.contains("<script>x</script>"));
    }

    #[test]
    fn test_toggle_closed_open_closed_only_changes_visibility() {
        let cart = cart_with(&[("Sneaker A", "$49.99")]);
        let mut view = CartView::new(THREE_SECONDS);

        view.toggle_panel();
        let open = view.render_panel(&cart).unwrap().unwrap().html;
        assert_eq!(view.toggle_panel(), PanelVisibility::Closed);
        let closed = view.render_panel(&cart).unwrap().unwrap().html;
        view.toggle_panel();
        view.toggle_panel();
        let closed_again = view.render_panel(&cart).unwrap().unwrap().html;

        assert_eq!(closed, closed_again);
        assert!(open.contains(r#"class="cart-container active""#));
        assert!(closed.contains(r#"class="cart-container""#));
        assert_eq!(
            closed.replace(r#"aria-hidden="true""#, r#"aria-hidden="false""#),
            open.replace("cart-container active", "cart-container")
        );
    }

    #[test]
    fn test_close_panel() {
        let mut view = CartView::new(THREE_SECONDS);
        assert!(!view.close_panel());
        assert_eq!(view.panel(), None);

        view.toggle_panel();
        assert!(view.close_panel());
        assert!(!view.close_panel());
        assert_eq!(view.panel(), Some(PanelVisibility::Closed));
    }

    #[test]
    fn test_notices_stack_and_expire() {
        let mut view = CartView::new(THREE_SECONDS);
        let first = view.show_transient_message("Product added to cart!", at(0)).unwrap();
        let second = view.show_transient_message("Product added to cart!", at(1_000)).unwrap();

        assert_ne!(first.region, second.region);
        assert!(first.html.contains(r#"data-dismiss-after="3000""#));
        assert_eq!(view.notices().len(), 2);

        assert!(view.expire_notices(at(2_999)).is_empty());
        assert_eq!(view.expire_notices(at(3_000)), vec![NoticeId::new(1)]);
        assert_eq!(view.expire_notices(at(4_000)), vec![NoticeId::new(2)]);
        assert!(view.notices().is_empty());
    }

    #[test]
    fn test_dismiss_notice() {
        let mut view = CartView::new(THREE_SECONDS);
        view.show_transient_message("Cart cleared!", at(0)).unwrap();

        assert!(view.dismiss_notice(NoticeId::new(1)));
        assert!(!view.dismiss_notice(NoticeId::new(1)));
    }

    #[test]
    fn test_state_survives_restore() {
        let mut view = CartView::new(THREE_SECONDS);
        view.toggle_panel();
        view.show_transient_message("Cart cleared!", at(0)).unwrap();

        let json = serde_json::to_string(view.state()).unwrap();
        let mut restored = CartView::restore(serde_json::from_str(&json).unwrap(), THREE_SECONDS);

        assert!(restored.is_panel_visible());
        assert_eq!(restored.notices(), view.notices());
        let next = restored.show_transient_message("again", at(10)).unwrap();
        assert_eq!(next.region, Region::Notice(NoticeId::new(2)));
    }
}
