//! Product cards shown on the storefront page.
//!
//! The cart does not model a catalog. These cards are page content: each one
//! is printed as-is and its add control carries the card's name, price text
//! and image as data attributes, which is all the cart ever sees.
//!
//! Cards load from `STOREFRONT_CATALOG` when set, otherwise from the bundled
//! `content/products.json`.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

const BUNDLED_PRODUCTS: &str = include_str!("../content/products.json");

/// Errors loading product cards.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid product cards: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One product card as printed on the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductCard {
    pub name: String,
    /// Price text exactly as displayed, e.g. `"$49.99"`.
    pub price: String,
    pub image: String,
}

/// Content store that holds all product cards in memory.
#[derive(Debug, Clone)]
pub struct ContentStore {
    products: Arc<Vec<ProductCard>>,
}

impl ContentStore {
    /// Load product cards from `path`, or the bundled cards if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array of
    /// cards.
    pub fn load(path: Option<&Path>) -> Result<Self, ContentError> {
        let products = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                tracing::info!("Loading product cards from {}", path.display());
                Self::parse(&raw)?
            }
            None => Self::parse(BUNDLED_PRODUCTS)?,
        };

        Ok(Self::from_cards(products))
    }

    /// Wrap an already-built list of cards.
    #[must_use]
    pub fn from_cards(products: Vec<ProductCard>) -> Self {
        Self {
            products: Arc::new(products),
        }
    }

    fn parse(raw: &str) -> Result<Vec<ProductCard>, ContentError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Product cards in page order.
    #[must_use]
    pub fn products(&self) -> &[ProductCard] {
        &self.products
    }
}
