//! Alarm sound resolution and the active playback list.
//!
//! The resolver turns an [`AlarmSelection`] into a playback strategy using
//! the sound table in [`super::catalog`]:
//!
//! 1. muted or `silent`: nothing plays
//! 2. a loadable file asset: loop it, retrying a failed start once
//! 3. otherwise the entry's synthesized tone, replayed on a fixed interval
//!
//! Everything the resolver starts (sounds, repeat tasks, retry tasks) goes
//! into a single list, and stopping tears the whole list down at once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::timer::scheduler::{Scheduler, TaskId};
use crate::types::{clamp_volume, AlarmSelection, CountdownConfig, SoundId};

use super::catalog::{cue_resolution, resolution_for, Cue, Resolution};
use super::error::SoundError;
use super::synth::ToneSequence;
use super::{Asset, PlayOptions, PlaybackBackend, PlaybackHandle, PlaybackSource};

/// Why a resource is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The looping completion alarm.
    Alarm,
    /// One-shot audition of a sound.
    Preview,
    /// Short interface feedback.
    Cue,
}

/// How the alarm (or a preview) is being rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmPlayback {
    /// Muted or silent selection: nothing plays.
    Silent,
    /// A file asset is playing.
    File { asset: String },
    /// A file asset failed to start; one retry is scheduled.
    Retrying { asset: String },
    /// A synthesized tone sequence.
    Synth(ToneSequence),
}

/// Result of a preview request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    Playing(AlarmPlayback),
    /// The selected sound is `silent`; show a "No Sound" acknowledgment.
    NoSound,
    /// Sound is muted; nothing was played.
    Muted,
}

#[derive(Debug, Clone)]
enum Strategy {
    Silent,
    File {
        asset: Asset,
        fallback: Option<ToneSequence>,
    },
    Synth(ToneSequence),
}

#[derive(Debug, Clone)]
enum TaskAction {
    RepeatTone(ToneSequence),
    RetryFile {
        asset: Asset,
        fallback: Option<ToneSequence>,
        continuous: bool,
    },
}

#[derive(Debug)]
enum Resource {
    Sound(PlaybackHandle),
    Task(TaskId, TaskAction),
}

#[derive(Debug)]
struct ActiveEntry {
    role: Role,
    resource: Resource,
}

/// Decides what plays when the countdown completes, and keeps it playing.
pub struct AlarmResolver {
    backend: Arc<dyn PlaybackBackend>,
    scheduler: Arc<dyn Scheduler>,
    selection: AlarmSelection,
    repeat_interval: Duration,
    retry_delay: Duration,
    active: Vec<ActiveEntry>,
}

impl AlarmResolver {
    pub fn new(
        backend: Arc<dyn PlaybackBackend>,
        scheduler: Arc<dyn Scheduler>,
        selection: AlarmSelection,
        config: &CountdownConfig,
    ) -> Self {
        Self {
            backend,
            scheduler,
            selection,
            repeat_interval: Duration::from_millis(config.alarm_repeat_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            active: Vec::new(),
        }
    }

    /// The canonical selection every playback path reads.
    pub fn selection(&self) -> &AlarmSelection {
        &self.selection
    }

    /// Replaces the selection. Volume and mute take effect immediately.
    pub fn set_selection(&mut self, selection: AlarmSelection) {
        let muted = selection.muted;
        let volume = selection.volume;
        self.selection = selection;
        self.set_volume(volume);
        self.set_muted(muted);
    }

    /// Sets the volume and applies it to every active sound.
    ///
    /// Returns the clamped volume.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = clamp_volume(volume);
        self.selection.volume = volume;
        for handle in self.sound_handles() {
            self.backend.set_volume(handle, volume);
        }
        volume
    }

    /// Sets the mute flag. Muting silences everything that is playing.
    pub fn set_muted(&mut self, muted: bool) {
        self.selection.muted = muted;
        if muted {
            self.release(|_| true);
        }
    }

    /// Starts the continuous completion alarm for the current selection.
    ///
    /// Anything already playing is released first.
    pub fn start_alarm(&mut self) -> AlarmPlayback {
        self.release(|_| true);

        if self.selection.is_silent() {
            info!("Alarm is silent (sound {}, muted {})", self.selection.sound, self.selection.muted);
            return AlarmPlayback::Silent;
        }

        let resolution = resolution_for(self.selection.sound, &self.selection);
        let strategy = self.resolve(&resolution);
        let playback = self.begin(Role::Alarm, strategy, true);
        info!("Alarm started: {:?}", playback);
        playback
    }

    /// Plays a sound once with the current volume.
    ///
    /// Replaces anything currently playing.
    pub fn preview(&mut self, sound: SoundId) -> PreviewOutcome {
        if sound == SoundId::Silent {
            return PreviewOutcome::NoSound;
        }
        if self.selection.muted {
            return PreviewOutcome::Muted;
        }

        self.release(|_| true);
        let resolution = resolution_for(sound, &self.selection);
        let strategy = self.resolve(&resolution);
        let playback = self.begin(Role::Preview, strategy, false);
        debug!("Previewing {}: {:?}", sound, playback);
        PreviewOutcome::Playing(playback)
    }

    /// Releases everything started by a preview.
    pub fn stop_preview(&mut self) {
        self.release(|role| role == Role::Preview);
    }

    /// Returns true while a preview is playing or pending a retry.
    pub fn is_previewing(&mut self) -> bool {
        self.reap_finished();
        self.active.iter().any(|e| e.role == Role::Preview)
    }

    /// Stops every sound and cancels every task the resolver started.
    ///
    /// Idempotent. Returns true if anything was released.
    pub fn stop_alarm(&mut self) -> bool {
        self.release(|_| true)
    }

    /// Plays an interface cue unless muted.
    pub fn play_cue(&mut self, cue: Cue) {
        if self.selection.muted {
            return;
        }
        self.reap_finished();
        let strategy = self.resolve(&cue_resolution(cue));
        self.begin(Role::Cue, strategy, false);
    }

    /// Handles a scheduler wakeup.
    ///
    /// Returns false if the task does not belong to the resolver.
    pub fn on_wakeup(&mut self, id: TaskId) -> bool {
        self.reap_finished();
        let Some(pos) = self
            .active
            .iter()
            .position(|e| matches!(e.resource, Resource::Task(task, _) if task == id))
        else {
            return false;
        };
        let role = self.active[pos].role;
        let action = match &self.active[pos].resource {
            Resource::Task(_, action) => action.clone(),
            Resource::Sound(_) => return false,
        };

        match action {
            TaskAction::RepeatTone(seq) => {
                debug!("Repeating {} tone", seq);
                if let Err(e) = self.play_now(role, &PlaybackSource::Tone(seq), false) {
                    warn!("Failed to repeat {} tone: {}", seq, e);
                }
            }
            TaskAction::RetryFile {
                asset,
                fallback,
                continuous,
            } => {
                self.active.remove(pos);
                debug!("Retrying playback of {}", asset.name);
                match self.play_now(role, &PlaybackSource::File(asset.clone()), continuous) {
                    Ok(()) => info!("Retry of {} succeeded", asset.name),
                    Err(e) => {
                        warn!("Retry of {} failed, falling back to synthesis: {}", asset.name, e);
                        if let Some(seq) = fallback {
                            self.begin_tone(role, seq, continuous);
                        }
                    }
                }
            }
        }
        true
    }

    /// Returns true while the completion alarm holds a sound, repeat or retry.
    pub fn is_ringing(&self) -> bool {
        self.active.iter().any(|e| e.role == Role::Alarm)
    }

    /// Drops finished sounds from the active list.
    pub fn reap_finished(&mut self) {
        let backend = &self.backend;
        self.active.retain(|e| match e.resource {
            Resource::Sound(handle) => !backend.is_finished(handle),
            Resource::Task(..) => true,
        });
    }

    /// Number of active sounds and tasks.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active repeat or retry tasks.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.active
            .iter()
            .filter_map(|e| match e.resource {
                Resource::Task(id, _) => Some(id),
                Resource::Sound(_) => None,
            })
            .collect()
    }

    /// Handles of active sounds.
    pub fn sound_handles(&self) -> Vec<PlaybackHandle> {
        self.active
            .iter()
            .filter_map(|e| match e.resource {
                Resource::Sound(handle) => Some(handle),
                Resource::Task(..) => None,
            })
            .collect()
    }

    /// Evaluates a table row: the file if it loads, else the tone, else nothing.
    fn resolve(&self, resolution: &Resolution) -> Strategy {
        if let Some(asset_ref) = &resolution.primary {
            match self.backend.load(asset_ref) {
                Ok(asset) => {
                    return Strategy::File {
                        asset,
                        fallback: resolution.fallback,
                    }
                }
                Err(e) => debug!("Asset {} unavailable, using synthesis: {}", asset_ref, e),
            }
        }
        match resolution.fallback {
            Some(seq) => Strategy::Synth(seq),
            None => Strategy::Silent,
        }
    }

    fn begin(&mut self, role: Role, strategy: Strategy, continuous: bool) -> AlarmPlayback {
        match strategy {
            Strategy::Silent => AlarmPlayback::Silent,
            Strategy::File { asset, fallback } => {
                match self.play_now(role, &PlaybackSource::File(asset.clone()), continuous) {
                    Ok(()) => AlarmPlayback::File { asset: asset.name },
                    Err(e) if role != Role::Cue && e.is_retryable() => {
                        warn!("Failed to start {}, retrying once: {}", asset.name, e);
                        let id = self.scheduler.schedule_once(self.retry_delay);
                        let name = asset.name.clone();
                        self.active.push(ActiveEntry {
                            role,
                            resource: Resource::Task(
                                id,
                                TaskAction::RetryFile {
                                    asset,
                                    fallback,
                                    continuous,
                                },
                            ),
                        });
                        AlarmPlayback::Retrying { asset: name }
                    }
                    Err(e) => {
                        debug!("Cannot play {}, using synthesis: {}", asset.name, e);
                        match fallback {
                            Some(seq) => self.begin_tone(role, seq, continuous),
                            None => AlarmPlayback::Silent,
                        }
                    }
                }
            }
            Strategy::Synth(seq) => self.begin_tone(role, seq, continuous),
        }
    }

    fn begin_tone(&mut self, role: Role, seq: ToneSequence, continuous: bool) -> AlarmPlayback {
        if let Err(e) = self.play_now(role, &PlaybackSource::Tone(seq), false) {
            warn!("Failed to play {} tone: {}", seq, e);
        }
        if continuous {
            let id = self.scheduler.schedule_repeating(self.repeat_interval);
            self.active.push(ActiveEntry {
                role,
                resource: Resource::Task(id, TaskAction::RepeatTone(seq)),
            });
        }
        AlarmPlayback::Synth(seq)
    }

    fn play_now(
        &mut self,
        role: Role,
        source: &PlaybackSource,
        looped: bool,
    ) -> Result<(), SoundError> {
        let options = PlayOptions {
            volume: self.selection.volume,
            looped,
        };
        let handle = self.backend.play(source, options)?;
        self.active.push(ActiveEntry {
            role,
            resource: Resource::Sound(handle),
        });
        Ok(())
    }

    /// Stops and cancels every entry whose role matches, in one pass.
    fn release(&mut self, matches_role: impl Fn(Role) -> bool) -> bool {
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|e| matches_role(e.role));
        self.active = kept;

        for entry in &released {
            match entry.resource {
                Resource::Sound(handle) => self.backend.stop(handle),
                Resource::Task(id, _) => self.scheduler.cancel(id),
            }
        }
        if !released.is_empty() {
            debug!("Released {} playback resources", released.len());
        }
        !released.is_empty()
    }
}

impl std::fmt::Debug for AlarmResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlarmResolver")
            .field("selection", &self.selection)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
