//! Integration tests for the countdown engine and alarm resolver.
//!
//! Every test drives the public API with a manual clock, a manual scheduler
//! and the mock playback backend, so time and audio are fully deterministic.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use countdown::sound::{PlaybackSource, ToneSequence};
use countdown::timer::Collaborators;
use countdown::types::{find_preset, format_hms, Preset};
use countdown::{
    AlarmPlayback, AlarmSelection, CountdownConfig, CountdownEngine, DurationInput, ManualClock,
    ManualScheduler, MemoryStore, MockPlaybackBackend, SoundId, TimerEvent, TimerState, PRESETS,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    engine: CountdownEngine,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    backend: Arc<MockPlaybackBackend>,
}

impl Harness {
    fn new() -> Self {
        Self::with_selection(AlarmSelection::default())
    }

    fn with_selection(selection: AlarmSelection) -> Self {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let backend = Arc::new(MockPlaybackBackend::new());
        let (tx, events) = mpsc::unbounded_channel();
        let collab = Collaborators {
            clock: clock.clone(),
            scheduler: scheduler.clone(),
            backend: backend.clone(),
            settings: Arc::new(MemoryStore::new()),
        };
        let engine =
            CountdownEngine::with_selection(collab, &CountdownConfig::default(), selection, tx);
        Self {
            engine,
            events,
            clock,
            scheduler,
            backend,
        }
    }

    /// Advances time in poll-sized steps, delivering each due poll wakeup.
    fn run_for(&mut self, ms: u64) {
        let step = 50;
        let mut elapsed = 0;
        while elapsed < ms {
            let dt = step.min(ms - elapsed);
            self.clock.advance_ms(dt);
            elapsed += dt;
            if let Some(id) = self.engine.poll_task() {
                self.engine.on_wakeup(id);
            }
        }
    }

    fn drain(&mut self) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    fn completed_count(&mut self) -> usize {
        self.drain()
            .iter()
            .filter(|e| matches!(e, TimerEvent::Completed))
            .count()
    }

    /// Sounds and tasks still held by anyone.
    fn live_resources(&self) -> usize {
        self.backend.active_count() + self.scheduler.active_count()
    }
}

fn preset(id: &str) -> Preset {
    find_preset(id).unwrap()
}

// ============================================================================
// Display formatting
// ============================================================================

#[test]
fn test_preset_selection_displays_zero_padded_hms() {
    for seconds in [0, 1, 59, 60, 61, 3599, 3600, 3661, 86_399, 359_999] {
        let mut h = Harness::new();
        h.engine.select_preset(Preset::new("custom", seconds));

        let shown = h.engine.snapshot().formatted();

        assert_eq!(shown, format_hms(seconds));
        assert_eq!(shown.len(), 8, "{} -> {}", seconds, shown);
    }
    assert_eq!(format_hms(3661), "01:01:01");
}

#[test]
fn test_every_builtin_preset_round_trips_to_display() {
    for p in PRESETS {
        let mut h = Harness::new();
        h.engine.select_preset(*p);
        assert_eq!(h.engine.snapshot().remaining_seconds, p.seconds);
        assert_eq!(h.engine.input().total_seconds(), p.seconds);
    }
}

// ============================================================================
// Time accounting
// ============================================================================

#[test]
fn test_pause_and_resume_never_increase_remaining() {
    let mut h = Harness::new();
    h.engine.select_preset(preset("1m"));
    h.engine.start();

    let mut last = h.engine.session().remaining_seconds;
    for round in 0..10u64 {
        h.run_for(1_000 + round * 137);
        let now = h.engine.session().remaining_seconds;
        assert!(now <= last, "remaining went from {} to {}", last, now);
        last = now;

        h.engine.pause();
        h.clock.advance_ms(5_000);
        assert_eq!(h.engine.session().remaining_seconds, last);

        h.engine.start();
        h.run_for(10);
        let resumed = h.engine.session().remaining_seconds;
        assert!(resumed <= last, "resume raised {} to {}", last, resumed);
        last = resumed;
    }
}

#[test]
fn test_five_second_session_completes_exactly_once() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 5));
    h.engine.start();

    h.run_for(4_950);
    assert_eq!(h.engine.state(), TimerState::Running);
    assert_eq!(h.completed_count(), 0);

    h.run_for(50);
    assert_eq!(h.engine.state(), TimerState::Complete);
    assert_eq!(h.completed_count(), 1);

    // Later wakeups, stale or not, cannot complete it again.
    h.run_for(10_000);
    for task in h.scheduler.active() {
        h.engine.on_wakeup(task.id);
    }
    assert_eq!(h.completed_count(), 0);
}

#[test]
fn test_delayed_wakeups_do_not_drift() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 30));
    h.engine.start();
    let poll = h.engine.poll_task().unwrap();

    // A throttled scheduler: one wakeup every 7 seconds.
    for _ in 0..4 {
        h.clock.advance_ms(7_000);
        h.engine.on_wakeup(poll);
    }

    assert_eq!(h.engine.session().remaining_seconds, 2);
}

#[test]
fn test_stale_poll_after_pause_resume_is_ignored() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 10));
    h.engine.start();
    let old_poll = h.engine.poll_task().unwrap();
    h.run_for(2_000);

    h.engine.pause();
    h.engine.start();
    let new_poll = h.engine.poll_task().unwrap();

    assert_ne!(old_poll, new_poll);
    assert!(!h.scheduler.is_active(old_poll));
    assert!(!h.engine.on_wakeup(old_poll));
    assert_eq!(h.scheduler.active_count(), 1);
}

#[test]
fn test_zero_duration_start_is_a_no_op() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 0));
    h.drain();

    assert!(!h.engine.start());

    assert_eq!(h.engine.state(), TimerState::Idle);
    assert_eq!(h.live_resources(), 0);
    assert_eq!(h.drain(), vec![TimerEvent::StartRejected]);
}

// ============================================================================
// Reset and teardown
// ============================================================================

#[test]
fn test_reset_from_every_state() {
    let setups: [(&str, fn(&mut Harness)); 4] = [
        ("idle", |h| h.engine.select_preset(preset("5m"))),
        ("running", |h| {
            h.engine.select_preset(preset("5m"));
            h.engine.start();
        }),
        ("paused", |h| {
            h.engine.select_preset(preset("5m"));
            h.engine.start();
            h.run_for(1_000);
            h.engine.pause();
        }),
        ("complete", |h| {
            h.engine.set_input(DurationInput::new(0, 0, 1));
            h.engine.start();
            h.run_for(1_000);
        }),
    ];

    for (name, setup) in setups {
        let mut h = Harness::new();
        setup(&mut h);

        h.engine.reset();

        assert_eq!(h.engine.state(), TimerState::Idle, "{}", name);
        assert_eq!(h.engine.session().remaining_seconds, 0, "{}", name);
        assert_eq!(h.engine.session().total_seconds, 0, "{}", name);
        assert_eq!(h.live_resources(), 0, "{}", name);
        assert_eq!(h.engine.alarm().active_count(), 0, "{}", name);
    }
}

#[test]
fn test_stop_alarm_twice_equals_once() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.run_for(1_000);
    assert_eq!(h.engine.state(), TimerState::Complete);

    h.engine.stop_alarm();
    let stops = h.backend.stop_calls();
    let cancels = h.scheduler.cancelled();
    let session = h.engine.session().clone();

    h.engine.stop_alarm();

    assert_eq!(h.backend.stop_calls(), stops);
    assert_eq!(h.scheduler.cancelled(), cancels);
    assert_eq!(h.engine.session(), &session);
    assert_eq!(h.live_resources(), 0);
}

#[test]
fn test_new_start_silences_ringing_alarm() {
    let mut h = Harness::new();
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.run_for(1_000);
    let alarm_tasks = h.engine.alarm().task_ids();
    assert_eq!(alarm_tasks.len(), 1);

    h.engine.start();

    assert!(!h.scheduler.is_active(alarm_tasks[0]));
    assert_eq!(h.engine.state(), TimerState::Running);
}

// ============================================================================
// Alarm resolution
// ============================================================================

#[test]
fn test_custom_without_upload_falls_back_to_chime() {
    let mut h = Harness::with_selection(AlarmSelection::new(SoundId::Custom));
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.drain();

    h.run_for(1_000);

    let events = h.drain();
    assert!(events.contains(&TimerEvent::AlarmStarted {
        playback: AlarmPlayback::Synth(ToneSequence::Chime)
    }));
    assert_eq!(
        h.backend.last_play().unwrap().source,
        PlaybackSource::Tone(ToneSequence::Chime)
    );

    h.engine.stop_alarm_and_reset();

    assert_eq!(h.live_resources(), 0);
    assert_eq!(h.engine.state(), TimerState::Idle);
}

#[test]
fn test_muted_completion_is_silent_but_complete() {
    let mut h = Harness::with_selection(AlarmSelection::new(SoundId::Bell).with_muted(true));
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.run_for(1_000);

    assert_eq!(h.engine.state(), TimerState::Complete);
    assert_eq!(h.backend.play_count(), 0, "muted start cue and alarm");
    assert!(h.drain().contains(&TimerEvent::AlarmStarted {
        playback: AlarmPlayback::Silent
    }));
}

#[test]
fn test_file_alarm_retry_then_fallback() {
    let mut h = Harness::with_selection(AlarmSelection::new(SoundId::Digital));
    h.backend.make_available("digital.mp3");
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.backend.fail_next_file_plays(2);

    h.run_for(1_000);
    let retry = h.scheduler.active()[0];
    assert!(!retry.repeating);

    h.scheduler.fire(retry.id);
    assert!(h.engine.on_wakeup(retry.id));

    assert_eq!(
        h.backend.last_play().unwrap().source,
        PlaybackSource::Tone(ToneSequence::Urgent)
    );
    assert_eq!(h.engine.alarm().task_ids().len(), 1);
}

#[test]
fn test_volume_change_reaches_ringing_alarm() {
    let mut h = Harness::with_selection(AlarmSelection::new(SoundId::Bell));
    h.backend.make_available("bell.mp3");
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();
    h.run_for(1_000);
    let alarm = h
        .backend
        .plays()
        .into_iter()
        .find(|p| matches!(p.source, PlaybackSource::File(_)))
        .unwrap();
    assert!(alarm.options.looped);

    h.engine.set_volume(0.1);

    assert_eq!(h.backend.volume_of(alarm.handle), Some(0.1));
}

#[test]
fn test_custom_upload_plays_file() {
    let path = PathBuf::from("/srv/sounds/custom.mp3");
    let mut h = Harness::with_selection(AlarmSelection::new(SoundId::Custom));
    h.backend.make_available(path.display().to_string());
    h.engine.set_custom_audio(Some(path));
    h.engine.set_input(DurationInput::new(0, 0, 1));
    h.engine.start();

    h.run_for(1_000);

    assert!(h.drain().contains(&TimerEvent::AlarmStarted {
        playback: AlarmPlayback::File {
            asset: "/srv/sounds/custom.mp3".into()
        }
    }));
}
