//! Cart store: cart state written through to a storage slot.
//!
//! Every mutation updates the in-memory [`CartState`] and then immediately
//! rewrites the whole slot, so anything that reads the store afterwards sees
//! exactly what was persisted. Storage problems never reach the caller: an
//! unreadable slot hydrates as an empty cart, and a rejected write is logged
//! while the in-memory cart stays authoritative for the rest of the session.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use storefront_cart_core::{AddOutcome, CartState, LineItem, LineItemId, Price, ProductDescriptor};

use crate::storage::{KeyValueStore, load_json, save_json};

/// Read the cart from `key`, or an empty cart if the slot is missing or
/// does not hold a valid cart.
pub fn load_cart(storage: &impl KeyValueStore, key: &str) -> CartState {
    load_json(storage, key).unwrap_or_default()
}

/// A cart bound to its storage slot.
#[derive(Debug)]
pub struct CartStore<S> {
    storage: S,
    key: String,
    state: CartState,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Hydrate the cart from `storage` under `key`.
    pub fn load(storage: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let state = load_cart(&storage, &key);
        debug!(key = %key, lines = state.items().len(), "Cart loaded");
        Self {
            storage,
            key,
            state,
        }
    }

    /// Current cart contents.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        self.state.items()
    }

    /// Look up a line by id.
    #[must_use]
    pub fn get(&self, id: LineItemId) -> Option<&LineItem> {
        self.state.get(id)
    }

    /// Add one unit of `product`, merging by name.
    pub fn add(&mut self, product: &ProductDescriptor, now: DateTime<Utc>) -> AddOutcome {
        let outcome = self.state.add(product, now);
        debug!(name = %product.name, ?outcome, "Added to cart");
        self.persist();
        outcome
    }

    /// Remove the line with `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: LineItemId) -> bool {
        let removed = self.state.remove(id);
        debug!(%id, removed, "Removed from cart");
        self.persist();
        removed
    }

    /// Set the quantity of the line with `id`, clamped to at least 1.
    ///
    /// Returns whether the line exists; nothing is written if it does not.
    pub fn set_quantity(&mut self, id: LineItemId, quantity: i64) -> bool {
        let found = self.state.set_quantity(id, quantity);
        if found {
            debug!(%id, quantity, "Cart quantity set");
            self.persist();
        }
        found
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.state.clear();
        debug!("Cart cleared");
        self.persist();
    }

    /// Sum of unit price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.state.total()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.state.count()
    }

    /// The backing storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Release the backing storage, e.g. to copy it back into a session.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn persist(&mut self) {
        if let Err(e) = save_json(&mut self.storage, &self.key, &self.state) {
            warn!(key = %self.key, error = %e, "Failed to persist cart");
        }
    }
}
