//! Alarm sound playback for the countdown timer.
//!
//! This module provides:
//!
//! - The [`PlaybackBackend`] seam (rodio-based, null, and mock backends)
//! - A declarative sound table with synthesized fallbacks
//! - The [`AlarmResolver`], which picks what to play and keeps it looping
//! - Validation for user-uploaded alarm files
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  AlarmResolver   │ ← selection, active playback list
//! └────────┬─────────┘
//!          │ resolution table
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ PlaybackBackend  │────▶│  Sound files     │
//! │                  │     │  (asset dir)     │
//! │                  │     ├──────────────────┤
//! │                  │────▶│  Tone synthesis  │
//! └──────────────────┘     │  (fallback)      │
//!                          └──────────────────┘
//! ```

pub mod alarm;
pub mod catalog;
mod error;
mod player;
pub mod synth;
pub mod upload;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub use alarm::{AlarmPlayback, AlarmResolver, PreviewOutcome, Role};
pub use catalog::{AssetRef, Cue, SoundEntry};
pub use error::{SoundError, UploadError};
pub use player::{create_backend, NullBackend, RodioBackend};
pub use synth::ToneSequence;

/// Identity of one playing sound, assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackHandle(u64);

impl PlaybackHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback#{}", self.0)
    }
}

/// A sound file loaded into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Asset {
    /// Key of the [`AssetRef`] it was loaded from.
    pub name: String,
    /// Encoded file contents.
    pub bytes: Arc<[u8]>,
}

impl Asset {
    pub fn new(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// What to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    File(Asset),
    Tone(ToneSequence),
}

impl PlaybackSource {
    /// Short description for logs.
    pub fn label(&self) -> String {
        match self {
            PlaybackSource::File(asset) => format!("file:{}", asset.name),
            PlaybackSource::Tone(seq) => format!("tone:{}", seq),
        }
    }
}

/// How to play it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayOptions {
    /// Volume in `[0, 1]`.
    pub volume: f32,
    /// Repeat until stopped.
    pub looped: bool,
}

/// Renders audio on behalf of the alarm resolver.
///
/// All methods are non-blocking. Completion is observed through
/// [`PlaybackBackend::is_finished`].
pub trait PlaybackBackend {
    /// Loads a file asset, verifying that it can be decoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or undecodable.
    fn load(&self, asset: &AssetRef) -> Result<Asset, SoundError>;

    /// Starts playing a source.
    ///
    /// # Errors
    ///
    /// Returns an error if playback could not be started.
    fn play(&self, source: &PlaybackSource, options: PlayOptions)
        -> Result<PlaybackHandle, SoundError>;

    /// Stops a sound and releases its resources. Unknown handles are ignored.
    fn stop(&self, handle: PlaybackHandle);

    /// Changes the volume of a playing sound.
    fn set_volume(&self, handle: PlaybackHandle, volume: f32);

    /// Returns true once a sound has ended or was stopped.
    fn is_finished(&self, handle: PlaybackHandle) -> bool;
}

// ============================================================================
// MockPlaybackBackend
// ============================================================================

/// A `play` call recorded by [`MockPlaybackBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub handle: PlaybackHandle,
    pub source: PlaybackSource,
    pub options: PlayOptions,
}

/// Mock playback backend for testing.
///
/// No asset is available until registered with
/// [`MockPlaybackBackend::make_available`].
#[derive(Debug, Default)]
pub struct MockPlaybackBackend {
    next_id: AtomicU64,
    available: Mutex<HashSet<String>>,
    plays: Mutex<Vec<PlayRecord>>,
    active: Mutex<HashMap<PlaybackHandle, f32>>,
    stops: Mutex<Vec<PlaybackHandle>>,
    undecodable: Mutex<HashSet<String>>,
    file_failures: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockPlaybackBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset key (bundled file name or file path) as loadable.
    pub fn make_available(&self, key: impl Into<String>) {
        self.available.lock().unwrap().insert(key.into());
    }

    /// Lets an asset load but makes every play of it fail to decode.
    pub fn make_undecodable(&self, key: impl Into<String>) {
        self.undecodable.lock().unwrap().insert(key.into());
    }

    /// Makes the next `n` file plays fail to start.
    pub fn fail_next_file_plays(&self, n: usize) {
        self.file_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every play fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn plays(&self) -> Vec<PlayRecord> {
        self.plays.lock().unwrap().clone()
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    #[must_use]
    pub fn last_play(&self) -> Option<PlayRecord> {
        self.plays.lock().unwrap().last().cloned()
    }

    /// Sounds started and neither stopped nor finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    #[must_use]
    pub fn active_handles(&self) -> Vec<PlaybackHandle> {
        let mut handles: Vec<_> = self.active.lock().unwrap().keys().copied().collect();
        handles.sort();
        handles
    }

    /// Current volume of an active sound.
    #[must_use]
    pub fn volume_of(&self, handle: PlaybackHandle) -> Option<f32> {
        self.active.lock().unwrap().get(&handle).copied()
    }

    #[must_use]
    pub fn stop_calls(&self) -> Vec<PlaybackHandle> {
        self.stops.lock().unwrap().clone()
    }

    /// Simulates a sound reaching its end.
    pub fn finish(&self, handle: PlaybackHandle) {
        self.active.lock().unwrap().remove(&handle);
    }

    pub fn clear_calls(&self) {
        self.plays.lock().unwrap().clear();
        self.stops.lock().unwrap().clear();
    }
}

impl PlaybackBackend for MockPlaybackBackend {
    fn load(&self, asset: &AssetRef) -> Result<Asset, SoundError> {
        let key = asset.key();
        if self.available.lock().unwrap().contains(&key) {
            Ok(Asset::new(key, Vec::new()))
        } else {
            Err(SoundError::FileNotFound(key))
        }
    }

    fn play(
        &self,
        source: &PlaybackSource,
        options: PlayOptions,
    ) -> Result<PlaybackHandle, SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        if let PlaybackSource::File(asset) = source {
            if self.undecodable.lock().unwrap().contains(&asset.name) {
                return Err(SoundError::DecodeError(asset.name.clone()));
            }
            let failed = self
                .file_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(SoundError::PlaybackError("Mock start failure".to_string()));
            }
        }

        let handle = PlaybackHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.active.lock().unwrap().insert(handle, options.volume);
        self.plays.lock().unwrap().push(PlayRecord {
            handle,
            source: source.clone(),
            options,
        });
        Ok(handle)
    }

    fn stop(&self, handle: PlaybackHandle) {
        self.active.lock().unwrap().remove(&handle);
        self.stops.lock().unwrap().push(handle);
    }

    fn set_volume(&self, handle: PlaybackHandle, volume: f32) {
        if let Some(v) = self.active.lock().unwrap().get_mut(&handle) {
            *v = volume;
        }
    }

    fn is_finished(&self, handle: PlaybackHandle) -> bool {
        !self.active.lock().unwrap().contains_key(&handle)
    }
}
