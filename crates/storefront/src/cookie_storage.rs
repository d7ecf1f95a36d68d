//! The cart slot as the browser keeps it: one cookie named after the
//! storage key.
//!
//! The browser owns the durable copy of the cart. Every write is sent back as
//! a `Set-Cookie`, so the cart survives host restarts and session expiry the
//! same way browser local storage would. Values are percent-encoded and
//! bounded by what a browser accepts for one cookie.

use axum::http::{HeaderMap, HeaderValue, header};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::storage::{KeyValueStore, StorageError};

/// Largest encoded value a cart cookie may carry.
pub const MAX_COOKIE_VALUE_BYTES: usize = 3800;

/// Lifetime of the cart cookie (one year).
const COOKIE_MAX_AGE_DAYS: i64 = 365;

/// A single named slot backed by a browser cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieStorage {
    name: String,
    value: Option<String>,
    written: bool,
}

impl CookieStorage {
    /// An empty slot named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            written: false,
        }
    }

    /// A slot already holding `value`, e.g. the copy kept for the current
    /// page load.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            written: false,
        }
    }

    /// Read the slot from the request's `Cookie` headers.
    ///
    /// A cookie that does not decode is logged and treated as missing.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, name: &str) -> Self {
        let raw = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string());

        let value = raw.and_then(|raw| match urlencoding::decode(&raw) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(e) => {
                tracing::warn!(cookie = name, error = %e, "Discarding undecodable cart cookie");
                None
            }
        });

        Self {
            name: name.to_string(),
            value,
            written: false,
        }
    }

    /// The slot's value if it was written during this request.
    #[must_use]
    pub fn written(&self) -> Option<&str> {
        if self.written {
            self.value.as_deref()
        } else {
            None
        }
    }

    /// The `Set-Cookie` value for a written slot.
    ///
    /// Returns `None` if nothing was written.
    #[must_use]
    pub fn set_cookie(&self, secure: bool) -> Option<HeaderValue> {
        let value = self.written()?;
        let cookie = Cookie::build((self.name.clone(), encode(value)))
            .path("/")
            .max_age(Duration::days(COOKIE_MAX_AGE_DAYS))
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(secure)
            .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(cookie = %self.name, error = %e, "Failed to encode cart cookie");
                None
            }
        }
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl KeyValueStore for CookieStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        if key == self.name {
            self.value.clone()
        } else {
            None
        }
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if key != self.name {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: format!("only the {} slot is stored", self.name),
            });
        }

        let encoded = encode(&value).len();
        if encoded > MAX_COOKIE_VALUE_BYTES {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: format!("{encoded} bytes exceeds cookie limit of {MAX_COOKIE_VALUE_BYTES}"),
            });
        }

        self.value = Some(value);
        self.written = true;
        Ok(())
    }
}
