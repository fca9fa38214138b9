//! JSON file backed settings store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{SettingsError, SettingsStore};

/// File name of the settings file inside the config directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Stores settings as a flat JSON object of strings.
///
/// The file is read once on open and rewritten on every `set`. If the file
/// is unreadable or corrupt the store keeps working in memory and never
/// writes, so the original file is left for the user to inspect.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
    available: AtomicBool,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (values, available) = match read_values(&path) {
            Ok(values) => (values, true),
            Err(e) => {
                warn!(
                    "Settings unavailable, continuing in memory ({}): {}",
                    path.display(),
                    e
                );
                (BTreeMap::new(), false)
            }
        };

        Self {
            path,
            values: Mutex::new(values),
            available: AtomicBool::new(available),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns false once the file could not be read or written.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn values(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values();
        values.insert(key.to_string(), value.to_string());

        if !self.is_available() {
            return;
        }
        match self.persist(&values) {
            Ok(()) => debug!("Saved setting {}={}", key, value),
            Err(e) => {
                warn!(
                    "Failed to save settings to {}, continuing in memory: {}",
                    self.path.display(),
                    e
                );
                self.available.store(false, Ordering::SeqCst);
            }
        }
    }
}

fn read_values(path: &Path) -> Result<BTreeMap<String, String>, SettingsError> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_and_available() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join(SETTINGS_FILE_NAME));
        assert!(store.is_available());
        assert_eq!(store.get("alarm.sound"), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE_NAME);

        let store = JsonFileStore::open(&path);
        store.set("alarm.volume", "0.75");
        store.set("ui.theme", "light");
        drop(store);

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("alarm.volume").as_deref(), Some("0.75"));
        assert_eq!(reopened.get("ui.theme").as_deref(), Some("light"));
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert!(!store.is_available());

        store.set("alarm.muted", "true");
        assert_eq!(store.get("alarm.muted").as_deref(), Some("true"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unwritable_location_keeps_values_in_memory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let store = JsonFileStore::open(blocker.join(SETTINGS_FILE_NAME));
        store.set("alarm.sound", "bark");

        assert!(!store.is_available());
        assert_eq!(store.get("alarm.sound").as_deref(), Some("bark"));
    }
}
