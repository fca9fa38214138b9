//! Playback backends.
//!
//! [`RodioBackend`] plays through the default audio device using rodio v0.20.
//! [`NullBackend`] stands in when no device can be opened, so the timer still
//! runs (silently) on headless machines.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use super::catalog::AssetRef;
use super::error::SoundError;
use super::synth::SAMPLE_RATE;
use super::{Asset, PlayOptions, PlaybackBackend, PlaybackHandle, PlaybackSource};

/// A playback backend that uses rodio.
///
/// Each playing sound owns one [`Sink`]; stopping a handle drops its sink.
/// The output stream is not `Send`, so the backend lives on the thread that
/// created it.
pub struct RodioBackend {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
    /// Directory holding bundled sound files.
    asset_dir: PathBuf,
    sinks: Mutex<HashMap<PlaybackHandle, Sink>>,
    next_id: AtomicU64,
}

impl RodioBackend {
    /// Opens the default audio device.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(asset_dir: impl Into<PathBuf>) -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
            asset_dir: asset_dir.into(),
            sinks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// Directory bundled assets are read from.
    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    fn path_of(&self, asset: &AssetRef) -> PathBuf {
        match asset {
            AssetRef::Bundled(name) => self.asset_dir.join(name),
            AssetRef::File(path) => path.clone(),
        }
    }

    fn sinks(&self) -> MutexGuard<'_, HashMap<PlaybackHandle, Sink>> {
        self.sinks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append_source(sink: &Sink, source: &PlaybackSource, looped: bool) -> Result<(), SoundError> {
        match source {
            PlaybackSource::File(asset) => {
                let cursor = Cursor::new(Arc::clone(&asset.bytes));
                if looped {
                    let decoder = Decoder::new_looped(cursor)
                        .map_err(|e| SoundError::DecodeError(format!("{}: {}", asset.name, e)))?;
                    sink.append(decoder);
                } else {
                    let decoder = Decoder::new(cursor)
                        .map_err(|e| SoundError::DecodeError(format!("{}: {}", asset.name, e)))?;
                    sink.append(decoder);
                }
            }
            PlaybackSource::Tone(seq) => {
                let buffer = SamplesBuffer::new(1, SAMPLE_RATE, seq.render());
                if looped {
                    sink.append(buffer.repeat_infinite());
                } else {
                    sink.append(buffer);
                }
            }
        }
        Ok(())
    }
}

impl PlaybackBackend for RodioBackend {
    fn load(&self, asset: &AssetRef) -> Result<Asset, SoundError> {
        let path = self.path_of(asset);
        let bytes = std::fs::read(&path)
            .map_err(|e| SoundError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let bytes: Arc<[u8]> = bytes.into();

        // Decode the header once so an unreadable file is caught at load time.
        Decoder::new(Cursor::new(Arc::clone(&bytes)))
            .map_err(|e| SoundError::DecodeError(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded sound asset {}", path.display());
        Ok(Asset {
            name: asset.key(),
            bytes,
        })
    }

    fn play(
        &self,
        source: &PlaybackSource,
        options: PlayOptions,
    ) -> Result<PlaybackHandle, SoundError> {
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| SoundError::StreamError(e.to_string()))?;
        sink.set_volume(options.volume);
        Self::append_source(&sink, source, options.looped)?;

        let handle = PlaybackHandle::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.sinks().insert(handle, sink);

        debug!(
            "Playing {} as {} (volume {:.2}, looped {})",
            source.label(),
            handle,
            options.volume,
            options.looped
        );
        Ok(handle)
    }

    fn stop(&self, handle: PlaybackHandle) {
        if let Some(sink) = self.sinks().remove(&handle) {
            sink.stop();
            debug!("Stopped {}", handle);
        }
    }

    fn set_volume(&self, handle: PlaybackHandle, volume: f32) {
        if let Some(sink) = self.sinks().get(&handle) {
            sink.set_volume(volume);
        }
    }

    fn is_finished(&self, handle: PlaybackHandle) -> bool {
        let mut sinks = self.sinks();
        let finished = sinks.get(&handle).map_or(true, Sink::empty);
        if finished {
            sinks.remove(&handle);
        }
        finished
    }
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend")
            .field("asset_dir", &self.asset_dir)
            .field("playing", &self.sinks().len())
            .finish_non_exhaustive()
    }
}

/// Backend used when no audio device is available.
///
/// Every load and play fails, so the resolver logs and carries on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl PlaybackBackend for NullBackend {
    fn load(&self, asset: &AssetRef) -> Result<Asset, SoundError> {
        Err(SoundError::DeviceNotAvailable(format!(
            "no audio output for {}",
            asset
        )))
    }

    fn play(
        &self,
        source: &PlaybackSource,
        _options: PlayOptions,
    ) -> Result<PlaybackHandle, SoundError> {
        Err(SoundError::DeviceNotAvailable(format!(
            "no audio output for {}",
            source.label()
        )))
    }

    fn stop(&self, _handle: PlaybackHandle) {}

    fn set_volume(&self, _handle: PlaybackHandle, _volume: f32) {}

    fn is_finished(&self, _handle: PlaybackHandle) -> bool {
        true
    }
}

/// Creates the best available backend.
///
/// If audio initialization fails, a warning is logged and a [`NullBackend`]
/// is returned.
#[must_use]
pub fn create_backend(asset_dir: &Path) -> Arc<dyn PlaybackBackend> {
    match RodioBackend::new(asset_dir) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            warn!("Audio not available, sound disabled: {}", e);
            Arc::new(NullBackend)
        }
    }
}
