//! Persisted user preferences.
//!
//! A [`SettingsStore`] is a string key-value store that never fails from the
//! caller's point of view: if the backing file cannot be read or written, the
//! problem is logged and the session continues with in-memory values.

mod file;
mod preferences;

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

pub use file::{JsonFileStore, SETTINGS_FILE_NAME};
pub use preferences::{keys, Preferences};

/// Key-value persistence for preferences.
pub trait SettingsStore {
    /// Returns the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str);
}

/// Reasons the backing file could not be used.
///
/// Never returned to callers of [`SettingsStore`]; only logged.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory store, used in tests and as the fallback when no file is usable.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry.
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.values.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }
}
