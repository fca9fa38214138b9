//! Typed access to the alarm and theme preferences.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::types::{clamp_volume, AlarmSelection, SoundId, Theme, DEFAULT_VOLUME};

use super::SettingsStore;

/// Keys used in the settings store.
pub mod keys {
    pub const SOUND: &str = "alarm.sound";
    pub const CUSTOM_AUDIO: &str = "alarm.custom_audio";
    pub const MUTED: &str = "alarm.muted";
    pub const VOLUME: &str = "alarm.volume";
    pub const THEME: &str = "ui.theme";
}

/// Reads and writes preferences through a [`SettingsStore`].
///
/// Unparseable stored values fall back to their defaults.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn SettingsStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Loads the alarm selection.
    pub fn load_selection(&self) -> AlarmSelection {
        let sound = self
            .parsed(keys::SOUND, |v| v.parse::<SoundId>().ok())
            .unwrap_or_default();
        let muted = self
            .parsed(keys::MUTED, |v| v.parse::<bool>().ok())
            .unwrap_or(false);
        let volume = self
            .parsed(keys::VOLUME, |v| v.parse::<f32>().ok().map(clamp_volume))
            .unwrap_or(DEFAULT_VOLUME);
        let custom_audio = self
            .store
            .get(keys::CUSTOM_AUDIO)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        AlarmSelection {
            sound,
            custom_audio,
            muted,
            volume,
        }
    }

    /// Persists every field of the selection.
    pub fn save_selection(&self, selection: &AlarmSelection) {
        self.store.set(keys::SOUND, selection.sound.as_str());
        self.store.set(keys::MUTED, &selection.muted.to_string());
        self.store.set(keys::VOLUME, &selection.volume.to_string());
        let custom = selection
            .custom_audio
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.store.set(keys::CUSTOM_AUDIO, &custom);
    }

    pub fn theme(&self) -> Theme {
        self.parsed(keys::THEME, |v| v.parse::<Theme>().ok())
            .unwrap_or_default()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.store.set(keys::THEME, theme.as_str());
    }

    fn parsed<T>(&self, key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let raw = self.store.get(key)?;
        let value = parse(&raw);
        if value.is_none() {
            warn!("Ignoring invalid stored value {}={:?}", key, raw);
        }
        value
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}
