//! Sound system error types.
//!
//! Playback errors never reach the user: the alarm resolver falls back to
//! synthesized tones. Upload errors are the one failure shown to the user.

use thiserror::Error;

/// Errors that can occur in the sound playback system.
#[derive(Debug, Error)]
pub enum SoundError {
    /// Audio device is not available (e.g., no speakers connected).
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),

    /// Sound file was not found at the specified path.
    #[error("sound file not found: {0}")]
    FileNotFound(String),

    /// Failed to decode the audio file.
    #[error("failed to decode sound file: {0}")]
    DecodeError(String),

    /// Failed to create the audio output stream or sink.
    #[error("failed to open audio stream: {0}")]
    StreamError(String),

    /// Generic sound playback error.
    #[error("sound playback error: {0}")]
    PlaybackError(String),
}

impl SoundError {
    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }

    /// Returns true if this error is related to the audio file.
    #[must_use]
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::FileNotFound(_) | Self::DecodeError(_))
    }

    /// Returns true if a later attempt to start the same asset may succeed.
    ///
    /// File errors will not go away by retrying; stream and playback errors
    /// can be transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StreamError(_) | Self::PlaybackError(_))
    }
}

/// Reasons an uploaded alarm file is rejected.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The file is not an MP3 (`audio/mpeg`).
    #[error("unsupported file type '{found}': please choose an MP3 file")]
    UnsupportedType {
        /// Detected type or extension.
        found: String,
    },

    /// The file exceeds the size ceiling.
    #[error("file is too large ({size} bytes): the limit is {max} bytes (5 MB)")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Maximum accepted size in bytes.
        max: u64,
    },

    /// Reading or installing the file failed.
    #[error("could not store the sound file: {0}")]
    Io(String),
}

impl UploadError {
    /// Returns true if the user picked a wrong file (as opposed to an I/O fault).
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. } | Self::TooLarge { .. })
    }
}
