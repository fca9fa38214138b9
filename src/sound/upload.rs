//! Validation and installation of a user-supplied alarm file.
//!
//! Only MPEG audio (`audio/mpeg`) up to [`MAX_UPLOAD_BYTES`] is accepted. The
//! type is decided from the file contents, not trusted from the extension
//! alone.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::UploadError;

/// Largest accepted upload: 5 MB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// The only accepted media type.
pub const ACCEPTED_MIME: &str = "audio/mpeg";

/// File name the accepted upload is stored under.
pub const CUSTOM_FILE_NAME: &str = "custom.mp3";

/// Guesses a media type from leading bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [b'I', b'D', b'3', ..] => Some("audio/mpeg"),
        // MPEG audio frame sync: 11 set bits.
        [0xFF, b1, ..] if b1 & 0xE0 == 0xE0 => Some("audio/mpeg"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some("audio/wav"),
        [b'O', b'g', b'g', b'S', ..] => Some("audio/ogg"),
        [b'f', b'L', b'a', b'C', ..] => Some("audio/flac"),
        _ => None,
    }
}

/// Checks that `path` is an acceptable alarm file and returns its contents.
///
/// # Errors
///
/// Returns `UploadError` if the file is missing, too large, or not MPEG audio.
pub fn validate_upload(path: &Path) -> Result<Vec<u8>, UploadError> {
    let meta = fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            UploadError::NotFound(path.display().to_string())
        } else {
            UploadError::Io(e.to_string())
        }
    })?;

    if !meta.is_file() {
        return Err(UploadError::NotFound(path.display().to_string()));
    }
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: meta.len(),
            max: MAX_UPLOAD_BYTES,
        });
    }

    let has_mp3_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"));
    if !has_mp3_ext {
        let found = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or_else(|| "no extension".to_string(), |ext| format!(".{}", ext));
        return Err(UploadError::UnsupportedType { found });
    }

    let bytes = fs::read(path).map_err(|e| UploadError::Io(e.to_string()))?;
    match sniff_mime(&bytes) {
        Some(ACCEPTED_MIME) => {
            debug!("Validated upload {} ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        Some(other) => Err(UploadError::UnsupportedType {
            found: other.to_string(),
        }),
        None => Err(UploadError::UnsupportedType {
            found: "unrecognized data".to_string(),
        }),
    }
}

/// Validates `src` and copies it into `dest_dir` as [`CUSTOM_FILE_NAME`].
///
/// Returns the installed path.
///
/// # Errors
///
/// Returns `UploadError` if validation fails or the copy cannot be written.
pub fn install_custom_sound(src: &Path, dest_dir: &Path) -> Result<PathBuf, UploadError> {
    let bytes = validate_upload(src)?;

    fs::create_dir_all(dest_dir).map_err(|e| UploadError::Io(e.to_string()))?;
    let dest = dest_dir.join(CUSTOM_FILE_NAME);
    fs::write(&dest, &bytes).map_err(|e| UploadError::Io(e.to_string()))?;

    info!("Installed custom alarm sound at {}", dest.display());
    Ok(dest)
}
