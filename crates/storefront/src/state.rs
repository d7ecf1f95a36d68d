//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::content::{ContentError, ContentStore};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and page content. Cart data is never held here; it lives
/// in each browser's session.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state, loading product cards per `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured product cards cannot be loaded.
    pub fn new(config: StorefrontConfig) -> Result<Self, ContentError> {
        let content = ContentStore::load(config.catalog_path.as_deref())?;
        Ok(Self::with_content(config, content))
    }

    /// Create application state around already-loaded content.
    #[must_use]
    pub fn with_content(config: StorefrontConfig, content: ContentStore) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, content }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the page content.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
