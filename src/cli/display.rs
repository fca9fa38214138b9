//! Display utilities for the countdown CLI.
//!
//! This module provides formatted output for:
//! - The live countdown line (status, `HH:MM:SS`, progress bar)
//! - Engine events
//! - Preset, sound and settings listings
//! - Error messages

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::sound::catalog::catalog;
use crate::sound::{AlarmPlayback, PreviewOutcome};
use crate::timer::TimerEvent;
use crate::types::{AlarmSelection, Preset, Snapshot, Theme, TimerState};

/// Width of the progress bar in characters.
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Renders the countdown line, e.g. `Running...  00:04:59  [###################-]  99%`.
    pub fn render_line(snapshot: &Snapshot) -> String {
        let percent = snapshot.progress_percent();
        format!(
            "{:<10}  {}  [{}]  {:>3.0}%",
            snapshot.state.status_label(),
            snapshot.formatted(),
            Self::progress_bar(percent, BAR_WIDTH),
            percent
        )
    }

    /// Renders a bar of `width` cells filled in proportion to `percent`.
    pub fn progress_bar(percent: f64, width: usize) -> String {
        let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
        format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
    }

    /// Redraws the countdown line in place.
    pub fn show_line(snapshot: &Snapshot, theme: Theme) {
        let line = Self::render_line(snapshot);
        let mut out = io::stdout();
        if out.is_terminal() {
            let color = Self::status_color(snapshot.state, theme);
            let _ = write!(out, "\r\x1b[2K{}{}\x1b[0m", color, line);
        } else {
            let _ = writeln!(out, "{}", line);
        }
        let _ = out.flush();
    }

    /// ANSI color for a state under the given theme.
    fn status_color(state: TimerState, theme: Theme) -> &'static str {
        match (state, theme) {
            (TimerState::Complete, _) => "\x1b[1;31m",
            (TimerState::Paused, Theme::Dark) => "\x1b[93m",
            (TimerState::Paused, Theme::Light) => "\x1b[33m",
            (_, Theme::Dark) => "\x1b[96m",
            (_, Theme::Light) => "\x1b[34m",
        }
    }

    /// Prints a message for an engine event. Ticks are shown by the line only.
    pub fn show_event(event: &TimerEvent) {
        let message = match event {
            TimerEvent::PresetSelected { preset, .. } => format!("Preset {} selected", preset),
            TimerEvent::InputEdited { input } => format!("Duration set to {}", input),
            TimerEvent::Started { .. } | TimerEvent::Resumed { .. } | TimerEvent::Tick { .. } => {
                return
            }
            TimerEvent::StartRejected => "Set a duration first".to_string(),
            TimerEvent::Paused { .. } => "Paused".to_string(),
            TimerEvent::Completed => "Time's Up!".to_string(),
            TimerEvent::AlarmStarted { playback } => Self::describe_playback(playback),
            TimerEvent::AlarmStopped => "Alarm stopped".to_string(),
            TimerEvent::Reset => "Reset".to_string(),
        };
        Self::println_below_line(&message);
    }

    fn describe_playback(playback: &AlarmPlayback) -> String {
        match playback {
            AlarmPlayback::Silent => "Alarm is silent (type 'stop' to dismiss)".to_string(),
            AlarmPlayback::File { asset } | AlarmPlayback::Retrying { asset } => {
                format!("Alarm started: {} (type 'stop' to dismiss)", asset)
            }
            AlarmPlayback::Synth(seq) => {
                format!("Alarm started: {} tone (type 'stop' to dismiss)", seq)
            }
        }
    }

    fn println_below_line(message: &str) {
        if io::stdout().is_terminal() {
            println!("\r\x1b[2K{}", message);
        } else {
            println!("{}", message);
        }
    }

    /// Shows the result of a preview request.
    pub fn show_preview_outcome(outcome: &PreviewOutcome) {
        match outcome {
            PreviewOutcome::Playing(AlarmPlayback::Synth(seq)) => {
                println!("Previewing {} tone", seq)
            }
            PreviewOutcome::Playing(AlarmPlayback::File { asset })
            | PreviewOutcome::Playing(AlarmPlayback::Retrying { asset }) => {
                println!("Previewing {}", asset)
            }
            PreviewOutcome::Playing(AlarmPlayback::Silent) | PreviewOutcome::NoSound => {
                println!("No Sound")
            }
            PreviewOutcome::Muted => println!("Sound is muted"),
        }
    }

    /// Lists the presets, marking the active one.
    pub fn show_presets(presets: &[Preset], active: Option<&str>) {
        println!("Presets");
        println!("─────────────────────────────");
        for preset in presets {
            let marker = if Some(preset.id) == active { '*' } else { ' ' };
            println!(
                "{} {:<4} {}",
                marker,
                preset.id,
                crate::types::format_hms(preset.seconds)
            );
        }
    }

    /// Lists the alarm sounds, marking the selected one.
    pub fn show_sounds(selection: &AlarmSelection) {
        println!("Alarm sounds");
        println!("─────────────────────────────");
        for entry in catalog() {
            let marker = if entry.id == selection.sound { '*' } else { ' ' };
            println!("{} {:<8} {}", marker, entry.id.as_str(), entry.label);
        }
    }

    /// Shows the saved preferences.
    pub fn show_settings(selection: &AlarmSelection, theme: Theme, config_dir: &Path) {
        println!("Settings");
        println!("─────────────────────────────");
        println!("Sound:   {}", selection.sound);
        println!("Volume:  {}%", Self::volume_percent(selection.volume));
        println!("Muted:   {}", if selection.muted { "yes" } else { "no" });
        match &selection.custom_audio {
            Some(path) => println!("Custom:  {}", path.display()),
            None => println!("Custom:  (none)"),
        }
        println!("Theme:   {}", theme.as_str());
        println!("Config:  {}", config_dir.display());
    }

    /// Shows the interactive session commands.
    pub fn show_session_help() {
        println!("Commands:");
        println!("  start | s          start or resume");
        println!("  pause | p          pause");
        println!("  reset | r          reset to zero");
        println!("  stop  | x          stop the alarm and reset");
        println!("  preset ID          select a preset (e.g. preset 5m)");
        println!("  set DURATION       set the duration (e.g. set 1:30)");
        println!("  volume N           set volume in percent");
        println!("  mute | unmute      toggle sound");
        println!("  preview            play the selected sound once");
        println!("  help               show this help");
        println!("  quit | q           exit");
    }

    /// Shows a success message.
    pub fn show_success(message: &str) {
        println!("* {}", message);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Converts a `[0, 1]` volume to a whole percent.
    pub fn volume_percent(volume: f32) -> u32 {
        (volume.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

// ============================================================================
// Tests
// ============================================================================
