//! Session-related types.
//!
//! The browser holds the durable cart in its own cookie. The session keeps
//! what one page load needs next to it: the widget's UI state and the copy of
//! the cart slot written by the latest event.

/// Session keys for cart widget data.
pub mod keys {
    /// Key for the widget's panel and notice state for the current page load.
    pub const CART_VIEW: &str = "cart_view";

    /// Key for the cart slot as last written, ahead of the browser cookie.
    pub const CART_SLOT: &str = "cart_slot";
}
