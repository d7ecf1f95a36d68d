//! Product descriptors supplied by the page for each add-to-cart control.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// What a product card tells the cart when its add control is pressed.
///
/// The page builds one of these per card; the cart never reads markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    /// Display name, also the key that merges repeated adds.
    pub name: String,
    /// Unit price as read from the card.
    pub price: Price,
    /// Image reference shown in the cart row.
    pub image_url: String,
}

impl ProductDescriptor {
    /// Create a descriptor from an already-parsed price.
    #[must_use]
    pub fn new(name: impl Into<String>, price: Price, image_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price,
            image_url: image_url.into(),
        }
    }

    /// Create a descriptor from the card's printed price text (e.g. `"$49.99"`).
    #[must_use]
    pub fn from_card(
        name: impl Into<String>,
        price_text: &str,
        image_url: impl Into<String>,
    ) -> Self {
        Self::new(name, Price::parse(price_text), image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_card_parses_price_text() {
        let product = ProductDescriptor::from_card("Sneaker A", "$49.99", "/img/a.png");
        assert_eq!(product.name, "Sneaker A");
        assert_eq!(product.price.to_string(), "49.99");
        assert_eq!(product.image_url, "/img/a.png");
    }

    #[test]
    fn test_from_card_keeps_unreadable_price() {
        let product = ProductDescriptor::from_card("Mystery Box", "Call us", "/img/box.png");
        assert!(product.price.is_nan());
    }
}
