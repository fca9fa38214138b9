//! Core data types for the countdown timer.
//!
//! This module defines the data structures used for:
//! - Timer lifecycle state and the countdown session
//! - Duration input and presets
//! - Alarm selection (sound, volume, mute) and theme preference
//! - Engine configuration with validation

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerState
// ============================================================================

/// Lifecycle state of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Nothing is counting; a duration may be selected.
    #[default]
    Idle,
    /// Counting down.
    Running,
    /// Counting is suspended with the remaining time frozen.
    Paused,
    /// The countdown reached zero and the alarm is active.
    Complete,
}

impl TimerState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
            TimerState::Complete => "complete",
        }
    }

    /// Returns the status line shown to the user.
    pub fn status_label(&self) -> &'static str {
        match self {
            TimerState::Idle => "Ready",
            TimerState::Running => "Running...",
            TimerState::Paused => "Paused",
            TimerState::Complete => "Time's Up!",
        }
    }

    /// Returns true if the countdown is actively running.
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerSession
// ============================================================================

/// Time accounting for the single countdown session.
///
/// While running, `remaining_seconds` is derived from `end_ms` and the clock on
/// every poll. While paused it holds the value frozen at pause time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSession {
    /// Duration committed at start (or preset selection).
    pub total_seconds: u32,
    /// Seconds left, rounded up.
    pub remaining_seconds: u32,
    /// Clock reading (milliseconds) at which the session expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
    /// Lifecycle state.
    pub state: TimerState,
}

impl TimerSession {
    /// Creates an idle, zeroed session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field back to the idle state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns a display snapshot of the session.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            remaining_seconds: self.remaining_seconds,
            total_seconds: self.total_seconds,
            state: self.state,
        }
    }
}

/// Seconds left until `end_ms`, rounded up, never negative.
pub fn seconds_until(end_ms: u64, now_ms: u64) -> u32 {
    let left_ms = end_ms.saturating_sub(now_ms);
    let secs = left_ms.div_ceil(1000);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

// ============================================================================
// Snapshot
// ============================================================================

/// What the display collaborator receives on every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Seconds left.
    #[serde(rename = "remainingSeconds")]
    pub remaining_seconds: u32,
    /// Committed duration.
    #[serde(rename = "totalSeconds")]
    pub total_seconds: u32,
    /// Lifecycle state.
    pub state: TimerState,
}

impl Snapshot {
    /// Remaining time as zero-padded `HH:MM:SS`.
    pub fn formatted(&self) -> String {
        format_hms(self.remaining_seconds)
    }

    /// Share of the committed duration still left, in percent.
    ///
    /// Returns 100 when no total is committed yet.
    pub fn progress_percent(&self) -> f64 {
        if self.total_seconds == 0 {
            return 100.0;
        }
        f64::from(self.remaining_seconds) / f64::from(self.total_seconds) * 100.0
    }
}

/// Formats seconds as zero-padded `HH:MM:SS`.
///
/// Hours are not wrapped, so `360000` renders as `100:00:00`.
pub fn format_hms(total_seconds: u32) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

// ============================================================================
// DurationInput
// ============================================================================

/// Hours/minutes/seconds as typed by the user.
///
/// Fields may exceed their natural range until [`DurationInput::normalized`]
/// is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationInput {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl DurationInput {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Splits a second count into normalized fields.
    pub fn from_seconds(total: u32) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// Total duration in seconds, saturating at `u32::MAX`.
    pub fn total_seconds(&self) -> u32 {
        let total = u64::from(self.hours) * 3600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds);
        u32::try_from(total).unwrap_or(u32::MAX)
    }

    /// Carries seconds >= 60 into minutes and minutes >= 60 into hours.
    pub fn normalized(&self) -> Self {
        let minutes = self.minutes.saturating_add(self.seconds / 60);
        Self {
            hours: self.hours.saturating_add(minutes / 60),
            minutes: minutes % 60,
            seconds: self.seconds % 60,
        }
    }
}

impl fmt::Display for DurationInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

impl FromStr for DurationInput {
    type Err = String;

    /// Accepts `S`, `M:S`, `H:M:S`, or unit forms such as `1h30m` and `45s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("duration must not be empty".to_string());
        }

        if s.chars().any(|c| c.is_ascii_alphabetic()) {
            return parse_unit_form(s);
        }

        let parts: Vec<&str> = s.split(':').collect();
        let mut fields = Vec::with_capacity(parts.len());
        for part in &parts {
            let value = part
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid duration component '{}'", part))?;
            fields.push(value);
        }

        match fields.as_slice() {
            [s] => Ok(Self::new(0, 0, *s)),
            [m, s] => Ok(Self::new(0, *m, *s)),
            [h, m, s] => Ok(Self::new(*h, *m, *s)),
            _ => Err(format!("invalid duration '{}': expected H:M:S", s)),
        }
    }
}

fn parse_unit_form(s: &str) -> Result<DurationInput, String> {
    let mut input = DurationInput::default();
    let mut digits = String::new();

    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value = digits
            .parse::<u32>()
            .map_err(|_| format!("invalid duration '{}'", s))?;
        digits.clear();
        match c.to_ascii_lowercase() {
            'h' => input.hours = value,
            'm' => input.minutes = value,
            's' => input.seconds = value,
            other => return Err(format!("unknown duration unit '{}'", other)),
        }
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after '{}' in '{}'", digits, s));
    }
    Ok(input)
}

// ============================================================================
// Presets
// ============================================================================

/// A one-click duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub seconds: u32,
}

impl Preset {
    pub const fn new(id: &'static str, seconds: u32) -> Self {
        Self { id, seconds }
    }
}

/// Built-in presets in display order.
pub const PRESETS: &[Preset] = &[
    Preset::new("1m", 60),
    Preset::new("3m", 3 * 60),
    Preset::new("5m", 5 * 60),
    Preset::new("10m", 10 * 60),
    Preset::new("15m", 15 * 60),
    Preset::new("25m", 25 * 60),
    Preset::new("30m", 30 * 60),
    Preset::new("45m", 45 * 60),
    Preset::new("1h", 60 * 60),
];

/// Looks up a built-in preset by id (case-insensitive).
pub fn find_preset(id: &str) -> Option<Preset> {
    PRESETS
        .iter()
        .copied()
        .find(|p| p.id.eq_ignore_ascii_case(id))
}

// ============================================================================
// SoundId / AlarmSelection
// ============================================================================

/// Alarm sound choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    #[default]
    Bell,
    Chime,
    Digital,
    Bark,
    /// The user's uploaded file.
    Custom,
    /// No sound; the completion status still shows.
    Silent,
}

impl SoundId {
    /// Every selectable sound, in display order.
    pub const ALL: [SoundId; 6] = [
        SoundId::Bell,
        SoundId::Chime,
        SoundId::Digital,
        SoundId::Bark,
        SoundId::Custom,
        SoundId::Silent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundId::Bell => "bell",
            SoundId::Chime => "chime",
            SoundId::Digital => "digital",
            SoundId::Bark => "bark",
            SoundId::Custom => "custom",
            SoundId::Silent => "silent",
        }
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sound '{}'", s))
    }
}

/// Default alarm volume.
pub const DEFAULT_VOLUME: f32 = 0.5;

/// The user's alarm preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSelection {
    /// Selected sound.
    pub sound: SoundId,
    /// Uploaded file used by [`SoundId::Custom`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_audio: Option<PathBuf>,
    /// Whether every sound is suppressed.
    pub muted: bool,
    /// Playback volume in `[0, 1]`.
    pub volume: f32,
}

impl Default for AlarmSelection {
    fn default() -> Self {
        Self {
            sound: SoundId::default(),
            custom_audio: None,
            muted: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

impl AlarmSelection {
    /// Creates a selection for the given sound with default volume.
    pub fn new(sound: SoundId) -> Self {
        Self {
            sound,
            ..Self::default()
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp_volume(volume);
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_custom_audio(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_audio = Some(path.into());
        self
    }

    /// Returns true if no sound should be produced for this selection.
    pub fn is_silent(&self) -> bool {
        self.muted || self.sound == SoundId::Silent
    }
}

/// Clamps a volume into `[0, 1]`; NaN becomes 0.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Theme
// ============================================================================

/// Visual theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

// ============================================================================
// CountdownConfig
// ============================================================================

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_alarm_repeat_ms() -> u64 {
    2000
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// Engine tuning, read from `config.json` in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// How often the running countdown is recomputed (10-1000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Repeat interval for synthesized alarm tones (500-60000).
    #[serde(default = "default_alarm_repeat_ms")]
    pub alarm_repeat_ms: u64,
    /// Delay before retrying a failed file playback (50-10000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Directory holding the bundled sound files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_dir: Option<PathBuf>,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            alarm_repeat_ms: default_alarm_repeat_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            asset_dir: None,
        }
    }
}

impl CountdownConfig {
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_alarm_repeat_ms(mut self, ms: u64) -> Self {
        self.alarm_repeat_ms = ms;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if !(10..=1000).contains(&self.poll_interval_ms) {
            return Err("poll_interval_ms must be within 10-1000".to_string());
        }
        if !(500..=60_000).contains(&self.alarm_repeat_ms) {
            return Err("alarm_repeat_ms must be within 500-60000".to_string());
        }
        if !(50..=10_000).contains(&self.retry_delay_ms) {
            return Err("retry_delay_ms must be within 50-10000".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
