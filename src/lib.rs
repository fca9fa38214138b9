//! Countdown Timer Library
//!
//! This library provides the core functionality for the countdown CLI.
//! It includes:
//! - The countdown state machine with drift-free remaining time
//! - Clock and cancellable scheduler abstractions
//! - Alarm resolution with file playback, synthesized fallbacks and retries
//! - Persisted preferences (sound, volume, mute, theme)
//! - CLI command parsing, the interactive session and display utilities

pub mod cli;
pub mod settings;
pub mod sound;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    AlarmSelection, CountdownConfig, DurationInput, Preset, Snapshot, SoundId, Theme,
    TimerSession, TimerState, PRESETS,
};

pub use timer::{
    Clock, Collaborators, CountdownEngine, ManualClock, ManualScheduler, Scheduler, SystemClock,
    TaskId, TimerEvent, TokioScheduler,
};

pub use sound::{
    create_backend, AlarmPlayback, AlarmResolver, MockPlaybackBackend, NullBackend,
    PlaybackBackend, PlaybackHandle, PreviewOutcome, RodioBackend, SoundError, UploadError,
};

pub use settings::{JsonFileStore, MemoryStore, Preferences, SettingsStore};
