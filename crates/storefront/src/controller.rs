//! Cart controller: turns widget events into store mutations and view
//! refreshes.
//!
//! The controller is the only place that touches both the [`CartStore`] and
//! the [`CartView`]. Events reach it through one delegated dispatch point,
//! keyed by the `data-action` and `data-id` attributes the view renders, so
//! re-rendering the panel never re-binds anything.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use storefront_cart_core::{LineItemId, ProductDescriptor};

use crate::config::WidgetConfig;
use crate::storage::KeyValueStore;
use crate::store::CartStore;
use crate::view::{CartView, Fragment, NoticeId, Region, ViewState};

/// Notice shown after a product is added.
pub const ADDED_MESSAGE: &str = "Product added to cart!";
/// Notice shown after a line is removed.
pub const REMOVED_MESSAGE: &str = "Product removed from cart!";
/// Notice shown after the cart is emptied.
pub const CLEARED_MESSAGE: &str = "Cart cleared!";
/// Blocking confirmation shown on checkout.
pub const CHECKOUT_MESSAGE: &str = "Thank you for your purchase!";

/// A shopper interaction with the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// Add-to-cart control on a product card.
    Add(ProductDescriptor),
    /// Cart icon.
    TogglePanel,
    /// Panel close control.
    ClosePanel,
    /// Row `+` control.
    Increment(LineItemId),
    /// Row `-` control.
    Decrement(LineItemId),
    /// Row remove control.
    Remove(LineItemId),
    /// Clear-cart control.
    Clear,
    /// Checkout control.
    Checkout,
    /// A notice finished its display time and removed itself.
    DismissNotice(NoticeId),
}

/// Errors turning a delegated event payload into a [`CartEvent`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Unknown cart action: {0}")]
    UnknownAction(String),
    #[error("Cart action {action} is missing {field}")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },
    #[error("Invalid id for cart action {action}: {value}")]
    InvalidId { action: &'static str, value: String },
}

/// Payload of a delegated event, as read from the clicked control's data
/// attributes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventForm {
    pub action: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
}

impl TryFrom<EventForm> for CartEvent {
    type Error = EventError;

    fn try_from(form: EventForm) -> Result<Self, Self::Error> {
        match form.action.as_str() {
            "add" => {
                let name = required(form.name, "add", "name")?;
                let price = form.price.unwrap_or_default();
                let image = form.image.unwrap_or_default();
                Ok(Self::Add(ProductDescriptor::from_card(name, &price, image)))
            }
            "toggle" => Ok(Self::TogglePanel),
            "close" => Ok(Self::ClosePanel),
            "increment" => Ok(Self::Increment(parse_id(form.id, "increment")?)),
            "decrement" => Ok(Self::Decrement(parse_id(form.id, "decrement")?)),
            "remove" => Ok(Self::Remove(parse_id(form.id, "remove")?)),
            "clear" => Ok(Self::Clear),
            "checkout" => Ok(Self::Checkout),
            "dismiss" => Ok(Self::DismissNotice(parse_id(form.id, "dismiss")?)),
            other => Err(EventError::UnknownAction(other.to_string())),
        }
    }
}

fn required(
    value: Option<String>,
    action: &'static str,
    field: &'static str,
) -> Result<String, EventError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(EventError::MissingField { action, field })
}

fn parse_id<T: std::str::FromStr>(
    value: Option<String>,
    action: &'static str,
) -> Result<T, EventError> {
    let value = required(value, action, "id")?;
    value
        .parse()
        .map_err(|_| EventError::InvalidId { action, value })
}

/// What the page must apply after an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refresh {
    /// Regions to re-render, in order.
    pub fragments: Vec<Fragment>,
    /// Blocking confirmation to show before applying the fragments.
    pub alert: Option<String>,
}

impl Refresh {
    /// The fragment for `region`, if it was re-rendered.
    #[must_use]
    pub fn fragment(&self, region: Region) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.region == region)
    }

    /// Whether the event changed nothing on the page.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.alert.is_none()
    }
}

/// The cart widget for one page: store, view and event handling.
#[derive(Debug)]
pub struct CartController<S> {
    store: CartStore<S>,
    view: CartView,
}

impl<S: KeyValueStore> CartController<S> {
    /// Assemble a controller from an already-loaded store and a view.
    pub const fn new(store: CartStore<S>, view: CartView) -> Self {
        Self { store, view }
    }

    /// Mount the widget on a fresh page load: hydrate the cart from
    /// `storage`, no panel, no notices.
    pub fn mount(storage: S, config: &WidgetConfig) -> Self {
        Self::resume(storage, ViewState::default(), config)
    }

    /// Resume the widget mid-page with UI state saved after the last event.
    pub fn resume(storage: S, view_state: ViewState, config: &WidgetConfig) -> Self {
        let store = CartStore::load(storage, config.storage_key.clone());
        let view = CartView::restore(view_state, config.notice_duration);
        Self::new(store, view)
    }

    /// The cart store.
    #[must_use]
    pub const fn store(&self) -> &CartStore<S> {
        &self.store
    }

    /// The view.
    #[must_use]
    pub const fn view(&self) -> &CartView {
        &self.view
    }

    /// Split back into store and view, e.g. to save both between requests.
    #[must_use]
    pub fn into_parts(self) -> (CartStore<S>, CartView) {
        (self.store, self.view)
    }

    /// Render every region for an initial page render.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    pub fn render_page(&self) -> askama::Result<Vec<Fragment>> {
        let mut fragments = vec![self.view.render_badge(self.store.count())?];
        if let Some(panel) = self.view.render_panel(self.store.state())? {
            fragments.push(panel);
        }
        Ok(fragments)
    }

    /// Handle one event and report what the page must re-render.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render. The cart mutation has
    /// already been persisted by then.
    #[instrument(skip(self), fields(lines = self.store.items().len()))]
    pub fn dispatch(&mut self, event: CartEvent, now: DateTime<Utc>) -> askama::Result<Refresh> {
        let expired = self.view.expire_notices(now);
        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired cart notices");
        }

        let mut refresh = Refresh::default();
        match event {
            CartEvent::Add(product) => {
                self.store.add(&product, now);
                self.refresh_after_mutation(&mut refresh)?;
                self.notify(&mut refresh, ADDED_MESSAGE, now)?;
            }
            CartEvent::Remove(id) => {
                if self.store.remove(id) {
                    self.refresh_after_mutation(&mut refresh)?;
                    self.notify(&mut refresh, REMOVED_MESSAGE, now)?;
                }
            }
            CartEvent::Increment(id) => self.adjust_quantity(id, 1, &mut refresh)?,
            CartEvent::Decrement(id) => self.adjust_quantity(id, -1, &mut refresh)?,
            CartEvent::Clear => {
                self.store.clear();
                self.refresh_after_mutation(&mut refresh)?;
                self.notify(&mut refresh, CLEARED_MESSAGE, now)?;
            }
            CartEvent::Checkout => {
                if self.store.items().is_empty() {
                    debug!("Checkout ignored for empty cart");
                    return Ok(refresh);
                }
                refresh.alert = Some(CHECKOUT_MESSAGE.to_string());
                self.store.clear();
                self.view.close_panel();
                self.refresh_after_mutation(&mut refresh)?;
                self.push_panel(&mut refresh)?;
                self.notify(&mut refresh, CLEARED_MESSAGE, now)?;
            }
            CartEvent::TogglePanel => {
                let visibility = self.view.toggle_panel();
                debug!(?visibility, "Cart panel toggled");
                self.push_panel(&mut refresh)?;
            }
            CartEvent::ClosePanel => {
                if self.view.close_panel() {
                    self.push_panel(&mut refresh)?;
                }
            }
            CartEvent::DismissNotice(id) => {
                self.view.dismiss_notice(id);
            }
        }
        Ok(refresh)
    }

    /// Quantity edits re-render silently: no notice.
    fn adjust_quantity(
        &mut self,
        id: LineItemId,
        delta: i64,
        refresh: &mut Refresh,
    ) -> askama::Result<()> {
        let Some(current) = self.store.get(id).map(|item| i64::from(item.quantity)) else {
            return Ok(());
        };
        self.store.set_quantity(id, current.saturating_add(delta));
        self.refresh_after_mutation(refresh)
    }

    /// Badge always; panel only if it exists and is open.
    fn refresh_after_mutation(&self, refresh: &mut Refresh) -> askama::Result<()> {
        refresh
            .fragments
            .push(self.view.render_badge(self.store.count())?);
        if self.view.is_panel_visible() {
            self.push_panel(refresh)?;
        }
        Ok(())
    }

    fn push_panel(&self, refresh: &mut Refresh) -> askama::Result<()> {
        if refresh.fragment(Region::Panel).is_some() {
            return Ok(());
        }
        if let Some(panel) = self.view.render_panel(self.store.state())? {
            refresh.fragments.push(panel);
        }
        Ok(())
    }

    fn notify(
        &mut self,
        refresh: &mut Refresh,
        text: &str,
        now: DateTime<Utc>,
    ) -> askama::Result<()> {
        let notice = self.view.show_transient_message(text, now)?;
        refresh.fragments.push(notice);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::view::PanelVisibility;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn widget() -> CartController<MemoryStorage> {
        CartController::mount(MemoryStorage::new(), &WidgetConfig::default())
    }

    fn add(name: &str, price: &str) -> CartEvent {
        CartEvent::Add(ProductDescriptor::from_card(name, price, "/img/p.png"))
    }

    fn notice_count(refresh: &Refresh) -> usize {
        refresh
            .fragments
            .iter()
            .filter(|f| matches!(f.region, Region::Notice(_)))
            .count()
    }

    fn form(action: &str, id: Option<&str>) -> EventForm {
        EventForm {
            action: action.to_string(),
            id: id.map(str::to_string),
            ..EventForm::default()
        }
    }

    #[test]
    fn test_parse_events() {
        assert_eq!(CartEvent::try_from(form("toggle", None)), Ok(CartEvent::TogglePanel));
        assert_eq!(
            CartEvent::try_from(form("increment", Some("12"))),
            Ok(CartEvent::Increment(LineItemId::new(12)))
        );
        assert_eq!(
            CartEvent::try_from(form("dismiss", Some("3"))),
            Ok(CartEvent::DismissNotice(NoticeId::new(3)))
        );

        let add = EventForm {
            action: "add".to_string(),
            name: Some("Sneaker A".to_string()),
            price: Some("$49.99".to_string()),
            image: Some("/img/a.png".to_string()),
            ..EventForm::default()
        };
        assert_eq!(
            CartEvent::try_from(add),
            Ok(CartEvent::Add(ProductDescriptor::from_card(
                "Sneaker A",
                "$49.99",
                "/img/a.png"
            )))
        );
    }

    #[test]
    fn test_parse_event_errors() {
        assert_eq!(
            CartEvent::try_from(form("explode", None)),
            Err(EventError::UnknownAction("explode".to_string()))
        );
        assert_eq!(
            CartEvent::try_from(form("remove", None)),
            Err(EventError::MissingField {
                action: "remove",
                field: "id"
            })
        );
        assert!(matches!(
            CartEvent::try_from(form("remove", Some("row-1"))),
            Err(EventError::InvalidId { .. })
        ));
        assert!(matches!(
            CartEvent::try_from(form("add", None)),
            Err(EventError::MissingField { field: "name", .. })
        ));
    }

    #[test]
    fn test_add_refreshes_badge_and_notifies() {
        let mut cart = widget();
        let refresh = cart.dispatch(add("Sneaker A", "$49.99"), at(1_000)).unwrap();

        let badge = refresh.fragment(Region::Badge).unwrap();
        assert!(badge.html.contains(r#"data-count="1""#));
        // Panel was never opened, so it is not rendered.
        assert!(refresh.fragment(Region::Panel).is_none());
        assert_eq!(notice_count(&refresh), 1);
        assert!(refresh.fragments.last().unwrap().html.contains(ADDED_MESSAGE));
    }

    #[test]
    fn test_quantity_changes_are_silent() {
        let mut cart = widget();
        cart.dispatch(add("Sneaker A", "$49.99"), at(1_000)).unwrap();
        cart.dispatch(CartEvent::TogglePanel, at(1_100)).unwrap();
        let id = cart.store().items()[0].id;

        let refresh = cart.dispatch(CartEvent::Increment(id), at(1_200)).unwrap();
        assert_eq!(notice_count(&refresh), 0);
        assert!(refresh.fragment(Region::Badge).unwrap().html.contains(r#"data-count="2""#));
        assert!(refresh.fragment(Region::Panel).unwrap().html.contains("<span>99.98</span>"));

        cart.dispatch(CartEvent::Decrement(id), at(1_300)).unwrap();
        let refresh = cart.dispatch(CartEvent::Decrement(id), at(1_400)).unwrap();
        assert_eq!(cart.store().items()[0].quantity, 1);
        assert_eq!(notice_count(&refresh), 0);
    }

    #[test]
    fn test_unknown_id_is_silent_noop() {
        let mut cart = widget();
        cart.dispatch(add("Sneaker A", "$49.99"), at(1_000)).unwrap();
        let missing = LineItemId::new(42);

        for event in [
            CartEvent::Remove(missing),
            CartEvent::Increment(missing),
            CartEvent::Decrement(missing),
        ] {
            let refresh = cart.dispatch(event, at(2_000)).unwrap();
            assert!(refresh.is_empty());
        }
        assert_eq!(cart.store().count(), 1);
    }

    #[test]
    fn test_remove_and_clear_notify() {
        let mut cart = widget();
        cart.dispatch(add("A", "$1"), at(1_000)).unwrap();
        cart.dispatch(add("B", "$2"), at(2_000)).unwrap();
        let id = cart.store().items()[0].id;

        let refresh = cart.dispatch(CartEvent::Remove(id), at(3_000)).unwrap();
        assert!(refresh.fragments.last().unwrap().html.contains(REMOVED_MESSAGE));

        let refresh = cart.dispatch(CartEvent::Clear, at(4_000)).unwrap();
        assert!(refresh.fragments.last().unwrap().html.contains(CLEARED_MESSAGE));
        assert!(!refresh.fragment(Region::Badge).unwrap().html.contains("data-count"));
        assert!(cart.store().items().is_empty());
    }

    #[test]
    fn test_closed_panel_is_not_rerendered_on_mutation() {
        let mut cart = widget();
        cart.dispatch(CartEvent::TogglePanel, at(1_000)).unwrap();
        cart.dispatch(CartEvent::TogglePanel, at(1_100)).unwrap();

        let refresh = cart.dispatch(add("A", "$1"), at(1_200)).unwrap();
        assert!(refresh.fragment(Region::Panel).is_none());
        assert_eq!(cart.view().panel(), Some(PanelVisibility::Closed));
    }

    #[test]
    fn test_checkout_empty_cart_is_inert() {
        let mut cart = widget();
        cart.dispatch(CartEvent::TogglePanel, at(1_000)).unwrap();

        let refresh = cart.dispatch(CartEvent::Checkout, at(2_000)).unwrap();
        assert!(refresh.is_empty());
        assert!(cart.view().is_panel_visible());
    }

    #[test]
    fn test_checkout_confirms_clears_and_closes() {
        let mut cart = widget();
        cart.dispatch(add("Sneaker A", "$49.99"), at(1_000)).unwrap();
        cart.dispatch(CartEvent::TogglePanel, at(1_100)).unwrap();

        let refresh = cart.dispatch(CartEvent::Checkout, at(2_000)).unwrap();
        assert_eq!(refresh.alert.as_deref(), Some(CHECKOUT_MESSAGE));
        assert!(cart.store().items().is_empty());
        assert_eq!(cart.view().panel(), Some(PanelVisibility::Closed));

        let panel = refresh.fragment(Region::Panel).unwrap();
        assert!(panel.html.contains(r#"class="cart-container""#));
        assert!(panel.html.contains("Your cart is empty"));
        assert!(!refresh.fragment(Region::Badge).unwrap().html.contains("data-count"));
    }

    #[test]
    fn test_close_control() {
        let mut cart = widget();
        assert!(cart.dispatch(CartEvent::ClosePanel, at(1_000)).unwrap().is_empty());

        cart.dispatch(CartEvent::TogglePanel, at(1_100)).unwrap();
        let refresh = cart.dispatch(CartEvent::ClosePanel, at(1_200)).unwrap();
        assert!(!refresh.fragment(Region::Panel).unwrap().html.contains("active"));
    }

    #[test]
    fn test_notices_expire_and_dismiss() {
        let mut cart = widget();
        cart.dispatch(add("A", "$1"), at(0)).unwrap();
        cart.dispatch(add("B", "$1"), at(1_000)).unwrap();
        assert_eq!(cart.view().notices().len(), 2);

        cart.dispatch(CartEvent::DismissNotice(NoticeId::new(2)), at(1_500)).unwrap();
        assert_eq!(cart.view().notices().len(), 1);

        cart.dispatch(CartEvent::TogglePanel, at(3_000)).unwrap();
        assert!(cart.view().notices().is_empty());
    }

    #[test]
    fn test_render_page_omits_uncreated_panel() {
        let mut cart = widget();
        assert_eq!(cart.render_page().unwrap().len(), 1);

        cart.dispatch(CartEvent::TogglePanel, at(0)).unwrap();
        let regions: Vec<_> = cart.render_page().unwrap().into_iter().map(|f| f.region).collect();
        assert_eq!(regions, vec![Region::Badge, Region::Panel]);
    }
}
