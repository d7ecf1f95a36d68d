//! Cart state: line items and their pure transitions.
//!
//! [`CartState`] holds the ordered line items and enforces the cart's
//! invariants: one line per product name and a quantity of at least one on
//! every line. It knows nothing about storage or rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::LineItemId;
use super::price::Price;
use super::product::ProductDescriptor;

/// One product entry in the cart.
///
/// Field names match the persisted slot layout: `id`, `name`, `price`,
/// `image`, `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub name: String,
    pub price: Price,
    #[serde(rename = "image")]
    pub image_url: String,
    pub quantity: u32,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Errors for cart data that breaks the cart's invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartStateError {
    #[error("Line item {0} has quantity 0")]
    ZeroQuantity(LineItemId),
    #[error("Duplicate line item name: {0}")]
    DuplicateName(String),
    #[error("Duplicate line item id: {0}")]
    DuplicateId(LineItemId),
}

/// Result of adding a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Inserted(LineItemId),
    /// An existing line with the same name gained one unit.
    Merged(LineItemId),
}

impl AddOutcome {
    /// The line item that received the product.
    #[must_use]
    pub const fn id(&self) -> LineItemId {
        match self {
            Self::Inserted(id) | Self::Merged(id) => *id,
        }
    }
}

/// Ordered cart contents, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LineItem>", into = "Vec<LineItem>")]
pub struct CartState {
    items: Vec<LineItem>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from existing line items, checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `CartStateError` if any line has quantity 0, or if two lines
    /// share a name or an id.
    pub fn from_items(items: Vec<LineItem>) -> Result<Self, CartStateError> {
        for (index, item) in items.iter().enumerate() {
            if item.quantity == 0 {
                return Err(CartStateError::ZeroQuantity(item.id));
            }
            let earlier = items.iter().take(index);
            for other in earlier {
                if other.name == item.name {
                    return Err(CartStateError::DuplicateName(item.name.clone()));
                }
                if other.id == item.id {
                    return Err(CartStateError::DuplicateId(item.id));
                }
            }
        }
        Ok(Self { items })
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by id.
    #[must_use]
    pub fn get(&self, id: LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Add one unit of `product`.
    ///
    /// Merges into the line with the same name if there is one, otherwise
    /// appends a new line with quantity 1 and a fresh id derived from `now`.
    pub fn add(&mut self, product: &ProductDescriptor, now: DateTime<Utc>) -> AddOutcome {
        if let Some(existing) = self.items.iter_mut().find(|item| item.name == product.name) {
            existing.quantity = existing.quantity.saturating_add(1);
            return AddOutcome::Merged(existing.id);
        }

        let id = self.next_id(now);
        self.items.push(LineItem {
            id,
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            quantity: 1,
        });
        AddOutcome::Inserted(id)
    }

    /// Drop the line with `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: LineItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Set the quantity of the line with `id`, clamped to at least 1.
    ///
    /// Returns whether the line exists. A requested quantity of zero or less
    /// never removes the line.
    pub fn set_quantity(&mut self, id: LineItemId, quantity: i64) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        item.quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        true
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Sum of quantities, shown on the cart badge.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |count, item| count.saturating_add(item.quantity))
    }

    /// Millisecond timestamp of `now`, bumped past every existing id.
    fn next_id(&self, now: DateTime<Utc>) -> LineItemId {
        let candidate = now.timestamp_millis();
        let next = self
            .items
            .iter()
            .map(|item| item.id.as_i64())
            .max()
            .map_or(candidate, |max| candidate.max(max.saturating_add(1)));
        LineItemId::new(next)
    }
}

impl TryFrom<Vec<LineItem>> for CartState {
    type Error = CartStateError;

    fn try_from(items: Vec<LineItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl From<CartState> for Vec<LineItem> {
    fn from(state: CartState) -> Self {
        state.items
    }
}
