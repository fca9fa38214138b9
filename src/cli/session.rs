//! Interactive countdown session.
//!
//! Reads one command per line from stdin while delivering scheduler wakeups
//! to the engine, all on the current-thread runtime.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::sound::PreviewOutcome;
use crate::timer::{CountdownEngine, TaskId, TimerEvent};
use crate::types::{DurationInput, Preset, Snapshot, Theme, TimerState};

use super::commands::{parse_duration, parse_preset};
use super::display::Display;

/// Longest time a one-shot preview is waited for.
const PREVIEW_WAIT: Duration = Duration::from_secs(10);

// ============================================================================
// SessionCommand
// ============================================================================

/// A command typed during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Pause,
    Reset,
    /// Stop the alarm and reset.
    Stop,
    Preset(Preset),
    Set(DurationInput),
    /// Volume in percent.
    Volume(u8),
    Mute,
    Unmute,
    Preview,
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let Some(word) = parts.next() else {
            return Err("empty command".to_string());
        };
        let arg = parts.next();
        if parts.next().is_some() {
            return Err(format!("too many arguments for '{}'", word));
        }

        let needs_arg = |name: &str| arg.ok_or_else(|| format!("'{}' needs an argument", name));

        match word.to_ascii_lowercase().as_str() {
            "start" | "s" => Ok(Self::Start),
            "pause" | "p" => Ok(Self::Pause),
            "reset" | "r" => Ok(Self::Reset),
            "stop" | "x" => Ok(Self::Stop),
            "preset" => parse_preset(needs_arg("preset")?).map(Self::Preset),
            "set" => parse_duration(needs_arg("set")?).map(Self::Set),
            "volume" => needs_arg("volume")?
                .parse::<u8>()
                .ok()
                .filter(|v| *v <= 100)
                .map(Self::Volume)
                .ok_or_else(|| "volume must be 0-100".to_string()),
            "mute" => Ok(Self::Mute),
            "unmute" => Ok(Self::Unmute),
            "preview" => Ok(Self::Preview),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{}' (type 'help')", other)),
        }
    }
}

/// Applies a command to the engine. Returns false when the session should end.
pub fn apply(engine: &mut CountdownEngine, command: SessionCommand) -> bool {
    match command {
        SessionCommand::Start => {
            engine.start();
        }
        SessionCommand::Pause => {
            engine.pause();
        }
        SessionCommand::Reset => engine.reset(),
        SessionCommand::Stop => engine.stop_alarm_and_reset(),
        SessionCommand::Preset(preset) => engine.select_preset(preset),
        SessionCommand::Set(input) => {
            if !engine.set_input(input) {
                Display::show_error("Pause or reset before changing the duration");
            }
        }
        SessionCommand::Volume(percent) => {
            engine.set_volume(f32::from(percent) / 100.0);
        }
        SessionCommand::Mute => engine.set_muted(true),
        SessionCommand::Unmute => engine.set_muted(false),
        SessionCommand::Preview => Display::show_preview_outcome(&engine.preview()),
        SessionCommand::Help => Display::show_session_help(),
        SessionCommand::Quit => return false,
    }
    true
}

// ============================================================================
// Session loop
// ============================================================================

/// Runs the interactive session until `quit`, Ctrl-C, or end of input.
///
/// After stdin closes, the session keeps running until the countdown is idle,
/// or complete with no alarm left ringing. A ringing alarm then loops until
/// Ctrl-C.
pub async fn run_session(
    mut engine: CountdownEngine,
    mut wakeups: mpsc::UnboundedReceiver<TaskId>,
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
    theme: Theme,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_shown: Option<Snapshot> = None;
    flush(&engine, &mut events, &mut last_shown, theme);

    loop {
        tokio::select! {
            Some(id) = wakeups.recv() => {
                engine.on_wakeup(id);
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match line.parse::<SessionCommand>() {
                        Ok(command) => {
                            if !apply(&mut engine, command) {
                                break;
                            }
                        }
                        Err(e) => Display::show_error(&e),
                    },
                    None => {
                        debug!("stdin closed");
                        stdin_open = false;
                    }
                }
            }
            _ = &mut ctrl_c => {
                debug!("Interrupted");
                break;
            }
        }

        flush(&engine, &mut events, &mut last_shown, theme);

        if !stdin_open && finished_without_input(&engine) {
            break;
        }
    }

    engine.dispose();
    println!();
    Ok(())
}

/// Returns true when a session with closed input has nothing left to do.
pub(crate) fn finished_without_input(engine: &CountdownEngine) -> bool {
    match engine.state() {
        TimerState::Idle => true,
        TimerState::Complete => !engine.is_alarm_ringing(),
        TimerState::Running | TimerState::Paused => false,
    }
}

/// Prints pending events, then the countdown line if it changed.
fn flush(
    engine: &CountdownEngine,
    events: &mut mpsc::UnboundedReceiver<TimerEvent>,
    last_shown: &mut Option<Snapshot>,
    theme: Theme,
) {
    let mut printed = false;
    while let Ok(event) = events.try_recv() {
        Display::show_event(&event);
        printed = true;
    }

    let snapshot = engine.snapshot();
    if printed || *last_shown != Some(snapshot) {
        Display::show_line(&snapshot, theme);
        *last_shown = Some(snapshot);
    }
}

/// Plays a preview and waits for it to finish.
pub async fn play_preview(
    engine: &mut CountdownEngine,
    wakeups: &mut mpsc::UnboundedReceiver<TaskId>,
    outcome: PreviewOutcome,
) {
    Display::show_preview_outcome(&outcome);
    if !matches!(outcome, PreviewOutcome::Playing(_)) {
        return;
    }

    let deadline = Instant::now() + PREVIEW_WAIT;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while engine.alarm_mut().is_previewing() && Instant::now() < deadline {
        tokio::select! {
            Some(id) = wakeups.recv() => {
                engine.on_wakeup(id);
            }
            _ = sleep(Duration::from_millis(100)) => {}
            _ = &mut ctrl_c => break,
        }
    }
    engine.stop_preview();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::settings::MemoryStore;
    use crate::sound::MockPlaybackBackend;
    use crate::timer::{Collaborators, ManualClock, ManualScheduler};
    use crate::types::{find_preset, AlarmSelection, CountdownConfig, SoundId};

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_simple_commands() {
            assert_eq!("start".parse(), Ok(SessionCommand::Start));
            assert_eq!("s".parse(), Ok(SessionCommand::Start));
            assert_eq!("P".parse(), Ok(SessionCommand::Pause));
            assert_eq!("x".parse(), Ok(SessionCommand::Stop));
            assert_eq!("q".parse(), Ok(SessionCommand::Quit));
            assert_eq!("  reset  ".parse(), Ok(SessionCommand::Reset));
        }

        #[test]
        fn test_parse_commands_with_arguments() {
            assert_eq!(
                "preset 5m".parse(),
                Ok(SessionCommand::Preset(find_preset("5m").unwrap()))
            );
            assert_eq!(
                "set 1:30".parse(),
                Ok(SessionCommand::Set(DurationInput::new(0, 1, 30)))
            );
            assert_eq!("volume 40".parse(), Ok(SessionCommand::Volume(40)));
        }

        #[test]
        fn test_parse_errors() {
            assert!("".parse::<SessionCommand>().is_err());
            assert!("dance".parse::<SessionCommand>().is_err());
            assert!("preset".parse::<SessionCommand>().is_err());
            assert!("volume 140".parse::<SessionCommand>().is_err());
            assert!("set 1 2".parse::<SessionCommand>().is_err());
        }
    }

    mod apply_tests {
        use super::*;

        fn engine() -> (CountdownEngine, Arc<ManualScheduler>) {
            let scheduler = Arc::new(ManualScheduler::new());
            let (tx, _rx) = mpsc::unbounded_channel();
            let collab = Collaborators {
                clock: Arc::new(ManualClock::new()),
                scheduler: scheduler.clone(),
                backend: Arc::new(MockPlaybackBackend::new()),
                settings: Arc::new(MemoryStore::new()),
            };
            (
                CountdownEngine::new(collab, &CountdownConfig::default(), tx),
                scheduler,
            )
        }

        #[test]
        fn test_apply_drives_engine() {
            let (mut engine, scheduler) = engine();

            assert!(apply(&mut engine, "set 90".parse().unwrap()));
            assert!(apply(&mut engine, SessionCommand::Start));
            assert_eq!(engine.state(), TimerState::Running);
            assert_eq!(scheduler.active_count(), 1);

            assert!(apply(&mut engine, SessionCommand::Pause));
            assert_eq!(engine.state(), TimerState::Paused);

            assert!(apply(&mut engine, SessionCommand::Stop));
            assert_eq!(engine.state(), TimerState::Idle);
        }

        fn completed(selection: AlarmSelection) -> CountdownEngine {
            let clock = Arc::new(ManualClock::new());
            let (tx, _rx) = mpsc::unbounded_channel();
            let collab = Collaborators {
                clock: clock.clone(),
                scheduler: Arc::new(ManualScheduler::new()),
                backend: Arc::new(MockPlaybackBackend::new()),
                settings: Arc::new(MemoryStore::new()),
            };
            let mut engine = CountdownEngine::with_selection(
                collab,
                &CountdownConfig::default(),
                selection,
                tx,
            );
            engine.set_input(DurationInput::new(0, 0, 1));
            engine.start();
            assert!(!finished_without_input(&engine));

            clock.advance_ms(1_000);
            let poll = engine.poll_task().unwrap();
            engine.on_wakeup(poll);
            assert_eq!(engine.state(), TimerState::Complete);
            engine
        }

        #[test]
        fn test_closed_input_keeps_ringing_alarm() {
            let mut engine = completed(AlarmSelection::new(SoundId::Bell));
            assert!(!finished_without_input(&engine));

            engine.stop_alarm();
            assert!(finished_without_input(&engine));
        }

        #[test]
        fn test_closed_input_ends_after_silent_completion() {
            let engine = completed(AlarmSelection::new(SoundId::Bell).with_muted(true));
            assert!(finished_without_input(&engine));
        }

        #[test]
        fn test_closed_input_ends_when_idle() {
            let (engine, _) = engine();
            assert!(finished_without_input(&engine));
        }

        #[test]
        fn test_apply_quit() {
            let (mut engine, _) = engine();
            assert!(!apply(&mut engine, SessionCommand::Quit));
        }

        #[test]
        fn test_apply_volume_and_mute() {
            let (mut engine, _) = engine();
            apply(&mut engine, SessionCommand::Volume(20));
            apply(&mut engine, SessionCommand::Mute);
            assert!((engine.selection().volume - 0.2).abs() < f32::EPSILON);
            assert!(engine.selection().muted);
        }
    }
}
