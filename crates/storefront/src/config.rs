//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//! - `STOREFRONT_CATALOG` - JSON file of product cards (default: bundled cards)
//! - `CART_STORAGE_KEY` - Name of the cart slot and its browser cookie (default: cart)
//! - `CART_NOTICE_MS` - How long a cart notice stays on screen (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::middleware::session::SESSION_COOKIE_NAME;

/// Default name of the persisted cart slot.
pub const DEFAULT_STORAGE_KEY: &str = "cart";

/// Default on-screen time of a cart notice.
pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Settings the cart widget itself needs, independent of any host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Key of the storage slot holding the serialized cart.
    pub storage_key: String,
    /// How long a transient notice stays on screen.
    pub notice_duration: Duration,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            notice_duration: DEFAULT_NOTICE_DURATION,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Product cards file; `None` serves the bundled cards
    pub catalog_path: Option<PathBuf>,
    /// Cart widget settings
    pub widget: WidgetConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let catalog_path = get_optional_env("STOREFRONT_CATALOG").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            base_url,
            catalog_path,
            widget: WidgetConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl WidgetConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let storage_key = get_env_or_default("CART_STORAGE_KEY", DEFAULT_STORAGE_KEY);
        validate_storage_key(&storage_key)?;

        let notice_duration = match get_optional_env("CART_NOTICE_MS") {
            Some(value) => parse_millis("CART_NOTICE_MS", &value)?,
            None => DEFAULT_NOTICE_DURATION,
        };

        Ok(Self {
            storage_key,
            notice_duration,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check that the cart slot can be stored as its own browser cookie.
fn validate_storage_key(key: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| {
        Err(ConfigError::InvalidEnvVar(
            "CART_STORAGE_KEY".to_string(),
            reason.to_string(),
        ))
    };

    if key.is_empty() {
        return invalid("must not be empty");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        return invalid("must contain only ASCII letters, digits, '-' or '_'");
    }
    if key == SESSION_COOKIE_NAME {
        return invalid("must differ from the session cookie name");
    }
    Ok(())
}

/// Parse a positive millisecond count.
fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let millis = value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if millis == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than 0".to_string(),
        ));
    }
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            catalog_path: None,
            widget: WidgetConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_widget_defaults() {
        let widget = WidgetConfig::default();
        assert_eq!(widget.storage_key, "cart");
        assert_eq!(widget.notice_duration, Duration::from_millis(3000));
    }

    #[test]
    fn test_parse_millis() {
        assert_eq!(
            parse_millis("CART_NOTICE_MS", "1500").unwrap(),
            Duration::from_millis(1500)
        );
        assert!(matches!(
            parse_millis("CART_NOTICE_MS", "0"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            parse_millis("CART_NOTICE_MS", "soon"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_validate_storage_key() {
        assert!(validate_storage_key("cart").is_ok());
        assert!(validate_storage_key("shop-cart_v2").is_ok());
        assert!(matches!(
            validate_storage_key(""),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(validate_storage_key("my cart").is_err());
        assert!(validate_storage_key("cart;x=1").is_err());
        assert!(validate_storage_key(SESSION_COOKIE_NAME).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("http://localhost:3000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        assert!(!config("http://localhost:3000").is_secure());
        assert!(config("https://shop.example.com").is_secure());
    }
}
