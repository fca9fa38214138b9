//! Countdown engine.
//!
//! This module provides the timer state machine:
//! - State transitions (Idle → Running → Paused / Complete)
//! - Drift-free remaining time, recomputed from the clock on every poll
//! - Preset selection and hand-edited duration input
//! - Handing completion over to the [`AlarmResolver`]
//!
//! The engine never sleeps or spawns. It asks the [`Scheduler`] for a
//! repeating poll and is driven by [`CountdownEngine::on_wakeup`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::settings::{Preferences, SettingsStore};
use crate::sound::{AlarmPlayback, AlarmResolver, Cue, PlaybackBackend, PreviewOutcome};
use crate::types::{
    seconds_until, AlarmSelection, CountdownConfig, DurationInput, Preset, Snapshot, SoundId,
    TimerSession, TimerState,
};

use super::clock::Clock;
use super::scheduler::{Scheduler, TaskId};

// ============================================================================
// TimerEvent
// ============================================================================

/// Events emitted by the engine for the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// A preset was chosen
    PresetSelected {
        /// Preset id, e.g. `5m`
        preset: &'static str,
        /// Preset duration
        seconds: u32,
    },
    /// The duration input was edited by hand
    InputEdited {
        /// Normalized input
        input: DurationInput,
    },
    /// A new countdown started
    Started {
        /// Committed duration
        total_seconds: u32,
    },
    /// A paused countdown resumed
    Resumed {
        /// Seconds left at resume
        remaining_seconds: u32,
    },
    /// Start was requested with a zero duration
    StartRejected,
    /// The displayed remaining time changed
    Tick {
        /// Seconds left
        remaining_seconds: u32,
    },
    /// Countdown paused
    Paused {
        /// Seconds left, frozen
        remaining_seconds: u32,
    },
    /// Countdown reached zero
    Completed,
    /// The completion alarm began
    AlarmStarted {
        /// How the alarm is rendered
        playback: AlarmPlayback,
    },
    /// The alarm was acknowledged
    AlarmStopped,
    /// Everything was cleared back to idle
    Reset,
}

// ============================================================================
// CountdownEngine
// ============================================================================

/// Services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub backend: Arc<dyn PlaybackBackend>,
    pub settings: Arc<dyn SettingsStore>,
}

/// The countdown state machine.
pub struct CountdownEngine {
    session: TimerSession,
    input: DurationInput,
    active_preset: Option<&'static str>,
    /// The single live poll task while running.
    poll_task: Option<TaskId>,
    poll_interval: Duration,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    alarm: AlarmResolver,
    prefs: Preferences,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
    disposed: bool,
}

impl CountdownEngine {
    /// Creates an idle engine, loading the alarm selection from settings.
    pub fn new(
        collab: Collaborators,
        config: &CountdownConfig,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let prefs = Preferences::new(collab.settings.clone());
        let selection = prefs.load_selection();
        Self::with_selection(collab, config, selection, event_tx)
    }

    /// Creates an idle engine with an explicit alarm selection.
    pub fn with_selection(
        collab: Collaborators,
        config: &CountdownConfig,
        selection: AlarmSelection,
        event_tx: mpsc::UnboundedSender<TimerEvent>,
    ) -> Self {
        let alarm = AlarmResolver::new(
            collab.backend.clone(),
            collab.scheduler.clone(),
            selection,
            config,
        );
        Self {
            session: TimerSession::new(),
            input: DurationInput::default(),
            active_preset: None,
            poll_task: None,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            clock: collab.clock,
            scheduler: collab.scheduler,
            alarm,
            prefs: Preferences::new(collab.settings),
            event_tx,
            disposed: false,
        }
    }

    // ------------------------------------------------------------------------
    // Duration selection
    // ------------------------------------------------------------------------

    /// Selects a preset duration.
    ///
    /// A running countdown or ringing alarm is reset first.
    pub fn select_preset(&mut self, preset: Preset) {
        if matches!(
            self.session.state,
            TimerState::Running | TimerState::Complete
        ) {
            self.reset();
        }

        self.session.total_seconds = preset.seconds;
        self.session.remaining_seconds = preset.seconds;
        self.session.end_ms = None;
        self.session.state = TimerState::Idle;
        self.active_preset = Some(preset.id);
        self.input = DurationInput::from_seconds(preset.seconds);

        debug!("Preset {} selected ({}s)", preset.id, preset.seconds);
        self.emit(TimerEvent::PresetSelected {
            preset: preset.id,
            seconds: preset.seconds,
        });
    }

    /// Replaces the hand-edited duration.
    ///
    /// Ignored while running. Returns false if ignored.
    pub fn set_input(&mut self, input: DurationInput) -> bool {
        if self.session.state.is_running() {
            debug!("Input is locked while running");
            return false;
        }

        self.active_preset = None;
        self.input = input.normalized();
        if self.session.state == TimerState::Idle {
            // The next start reads the edited input.
            self.session.total_seconds = 0;
            self.session.remaining_seconds = 0;
        }

        self.emit(TimerEvent::InputEdited { input: self.input });
        true
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Starts or resumes the countdown.
    ///
    /// Returns false if nothing started (already running, or zero duration).
    pub fn start(&mut self) -> bool {
        if self.disposed {
            return false;
        }

        let resuming = match self.session.state {
            TimerState::Running => return false,
            TimerState::Paused => true,
            TimerState::Idle | TimerState::Complete => {
                if self.session.remaining_seconds == 0 {
                    let seconds = self.input.total_seconds();
                    if seconds == 0 {
                        debug!("Start rejected: zero duration");
                        self.emit(TimerEvent::StartRejected);
                        return false;
                    }
                    self.session.total_seconds = seconds;
                    self.session.remaining_seconds = seconds;
                }
                false
            }
        };

        self.alarm.stop_alarm();
        self.cancel_poll();

        let now = self.clock.now_ms();
        self.session.end_ms = Some(now + u64::from(self.session.remaining_seconds) * 1000);
        self.session.state = TimerState::Running;
        self.poll_task = Some(self.scheduler.schedule_repeating(self.poll_interval));
        self.alarm.play_cue(Cue::Start);

        if resuming {
            info!("Resumed with {}s left", self.session.remaining_seconds);
            self.emit(TimerEvent::Resumed {
                remaining_seconds: self.session.remaining_seconds,
            });
        } else {
            info!("Started {}s countdown", self.session.total_seconds);
            self.emit(TimerEvent::Started {
                total_seconds: self.session.total_seconds,
            });
        }
        true
    }

    /// Pauses a running countdown. Returns false if not running.
    pub fn pause(&mut self) -> bool {
        if !self.session.state.is_running() {
            return false;
        }

        self.cancel_poll();
        self.session.state = TimerState::Paused;
        self.session.end_ms = None;

        info!("Paused with {}s left", self.session.remaining_seconds);
        self.emit(TimerEvent::Paused {
            remaining_seconds: self.session.remaining_seconds,
        });
        true
    }

    /// Clears everything back to an idle, zeroed session.
    pub fn reset(&mut self) {
        self.cancel_poll();
        self.alarm.stop_alarm();
        self.session.clear();
        self.active_preset = None;
        self.input = DurationInput::default();

        debug!("Timer reset");
        self.emit(TimerEvent::Reset);
    }

    /// Recomputes the remaining time from the clock.
    pub fn poll(&mut self) {
        if !self.session.state.is_running() {
            return;
        }
        let Some(end_ms) = self.session.end_ms else {
            return;
        };

        let remaining = seconds_until(end_ms, self.clock.now_ms());
        if remaining == 0 {
            self.complete();
            return;
        }
        if remaining != self.session.remaining_seconds {
            self.session.remaining_seconds = remaining;
            self.emit(TimerEvent::Tick {
                remaining_seconds: remaining,
            });
        }
    }

    /// Routes a scheduler wakeup.
    ///
    /// Returns false if the id is stale (cancelled or unknown).
    pub fn on_wakeup(&mut self, id: TaskId) -> bool {
        if self.poll_task == Some(id) {
            self.poll();
            return true;
        }
        if self.alarm.on_wakeup(id) {
            return true;
        }
        debug!("Ignoring stale wakeup {}", id);
        false
    }

    fn complete(&mut self) {
        if !self.session.state.is_running() {
            return;
        }

        self.cancel_poll();
        self.session.remaining_seconds = 0;
        self.session.end_ms = None;
        self.session.state = TimerState::Complete;

        info!("Countdown complete");
        self.emit(TimerEvent::Completed);

        let playback = self.alarm.start_alarm();
        self.emit(TimerEvent::AlarmStarted { playback });
    }

    /// Acknowledges the alarm without touching the session.
    ///
    /// Returns true if any playback was released.
    pub fn stop_alarm(&mut self) -> bool {
        let released = self.alarm.stop_alarm();
        if released {
            self.emit(TimerEvent::AlarmStopped);
        }
        released
    }

    /// Stops the alarm, then resets.
    pub fn stop_alarm_and_reset(&mut self) {
        self.stop_alarm();
        self.reset();
    }

    /// Releases the poll task and all playback. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_poll();
        self.alarm.stop_alarm();
        self.disposed = true;
        debug!("Engine disposed");
    }

    fn cancel_poll(&mut self) {
        if let Some(id) = self.poll_task.take() {
            self.scheduler.cancel(id);
        }
    }

    // ------------------------------------------------------------------------
    // Alarm selection
    // ------------------------------------------------------------------------

    /// Chooses the alarm sound and persists it.
    pub fn select_sound(&mut self, sound: SoundId) {
        let selection = AlarmSelection {
            sound,
            ..self.alarm.selection().clone()
        };
        self.alarm.set_selection(selection);
        self.persist_selection();
    }

    /// Sets or clears the uploaded sound file and persists it.
    pub fn set_custom_audio(&mut self, path: Option<PathBuf>) {
        let selection = AlarmSelection {
            custom_audio: path,
            ..self.alarm.selection().clone()
        };
        self.alarm.set_selection(selection);
        self.persist_selection();
    }

    /// Sets the volume, applies it to playing sounds and persists it.
    ///
    /// Returns the clamped volume.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = self.alarm.set_volume(volume);
        self.persist_selection();
        self.alarm.play_cue(Cue::Click);
        volume
    }

    /// Sets mute and persists it. Muting silences a ringing alarm.
    pub fn set_muted(&mut self, muted: bool) {
        self.silencing(|alarm| alarm.set_muted(muted));
        self.persist_selection();
    }

    /// Flips mute. Returns the new mute state.
    pub fn toggle_mute(&mut self) -> bool {
        let muted = !self.alarm.selection().muted;
        self.set_muted(muted);
        muted
    }

    /// Previews the selected sound.
    pub fn preview(&mut self) -> PreviewOutcome {
        let sound = self.alarm.selection().sound;
        self.preview_sound(sound)
    }

    /// Previews a sound other than the selected one.
    ///
    /// A preview replaces a ringing alarm.
    pub fn preview_sound(&mut self, sound: SoundId) -> PreviewOutcome {
        self.silencing(|alarm| alarm.preview(sound))
    }

    pub fn stop_preview(&mut self) {
        self.alarm.stop_preview();
    }

    /// Runs a resolver call and reports an alarm it released.
    fn silencing<T>(&mut self, f: impl FnOnce(&mut AlarmResolver) -> T) -> T {
        let was_ringing = self.alarm.is_ringing();
        let out = f(&mut self.alarm);
        if was_ringing && !self.alarm.is_ringing() {
            info!("Alarm silenced");
            self.emit(TimerEvent::AlarmStopped);
        }
        out
    }

    fn persist_selection(&self) {
        self.prefs.save_selection(self.alarm.selection());
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> TimerState {
        self.session.state
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    /// What the display should show.
    ///
    /// While idle with nothing committed, the edited input is shown.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = self.session.snapshot();
        if snapshot.state == TimerState::Idle && snapshot.total_seconds == 0 {
            snapshot.remaining_seconds = self.input.total_seconds();
        }
        snapshot
    }

    pub fn active_preset(&self) -> Option<&'static str> {
        self.active_preset
    }

    pub fn input(&self) -> DurationInput {
        self.input
    }

    pub fn selection(&self) -> &AlarmSelection {
        self.alarm.selection()
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Returns true while the completion alarm is sounding or pending.
    pub fn is_alarm_ringing(&self) -> bool {
        self.alarm.is_ringing()
    }

    pub fn alarm(&self) -> &AlarmResolver {
        &self.alarm
    }

    /// Mutable access to the resolver, for reaping finished previews.
    pub fn alarm_mut(&mut self) -> &mut AlarmResolver {
        &mut self.alarm
    }

    pub fn poll_task(&self) -> Option<TaskId> {
        self.poll_task
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

impl Drop for CountdownEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for CountdownEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownEngine")
            .field("session", &self.session)
            .field("input", &self.input)
            .field("active_preset", &self.active_preset)
            .field("poll_task", &self.poll_task)
            .field("alarm", &self.alarm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
