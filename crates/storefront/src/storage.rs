//! Key-value storage slots for the cart.
//!
//! The cart persists into a single named slot of a string key-value store,
//! the same shape as a browser's local storage. [`KeyValueStore`] is that
//! contract; [`MemoryStorage`] is the in-process implementation. The host
//! keeps the slot in a browser cookie instead (see
//! [`CookieStorage`](crate::cookie_storage::CookieStorage)).

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage slot errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to serialize value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Storage write rejected for {key}: {reason}")]
    Write { key: String, reason: String },
}

/// A string key-value store.
pub trait KeyValueStore {
    /// Read the raw value of a slot.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Overwrite a slot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Write` if the store refuses the value.
    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// Load a JSON value from `key`.
///
/// Missing slots and unparseable contents both yield `None`; the parse
/// failure is logged.
pub fn load_json<T: DeserializeOwned>(storage: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = storage.get_item(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable storage slot");
            None
        }
    }
}

/// Save a JSON value to `key`.
///
/// # Errors
///
/// Returns `StorageError` if the value cannot be serialized or the store
/// rejects the write.
pub fn save_json<T: Serialize>(
    storage: &mut impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set_item(key, raw)
}

/// In-memory key-value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an empty store with no size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects values longer than `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            slots: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Create a store holding a single slot, e.g. one restored from a session.
    #[must_use]
    pub fn with_slot(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut slots = HashMap::new();
        slots.insert(key.into(), value.into());
        Self { slots, quota: None }
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        if let Some(quota) = self.quota
            && value.len() > quota
        {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: format!("{} bytes exceeds quota of {quota}", value.len()),
            });
        }
        self.slots.insert(key.to_string(), value);
        Ok(())
    }
}
