//! Declarative sound table.
//!
//! Every selectable sound maps to an optional file asset and an optional
//! synthesized fallback. The alarm resolver evaluates these entries with one
//! generic function instead of branching per sound.

use std::fmt;
use std::path::PathBuf;

use crate::types::{AlarmSelection, SoundId};

use super::synth::ToneSequence;

/// Where a sound file lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetRef {
    /// A file shipped in the asset directory, by file name.
    Bundled(&'static str),
    /// An arbitrary file, such as the user's uploaded sound.
    File(PathBuf),
}

impl AssetRef {
    /// Stable key for logging and lookups.
    pub fn key(&self) -> String {
        match self {
            AssetRef::Bundled(name) => (*name).to_string(),
            AssetRef::File(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One row of the sound table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundEntry {
    pub id: SoundId,
    pub label: &'static str,
    /// Bundled file tried first.
    pub asset: Option<&'static str>,
    /// Tone used when the file is unavailable.
    pub fallback: Option<ToneSequence>,
}

const CATALOG: [SoundEntry; 6] = [
    SoundEntry {
        id: SoundId::Bell,
        label: "Bell",
        asset: Some("bell.mp3"),
        fallback: Some(ToneSequence::Bell),
    },
    SoundEntry {
        id: SoundId::Chime,
        label: "Chime",
        asset: Some("chime.mp3"),
        fallback: Some(ToneSequence::Chime),
    },
    SoundEntry {
        id: SoundId::Digital,
        label: "Digital alarm",
        asset: Some("digital.mp3"),
        fallback: Some(ToneSequence::Urgent),
    },
    SoundEntry {
        id: SoundId::Bark,
        label: "Dog bark",
        asset: Some("bark.mp3"),
        fallback: Some(ToneSequence::Bark),
    },
    // The uploaded file is supplied by the selection, not the table.
    SoundEntry {
        id: SoundId::Custom,
        label: "Custom upload",
        asset: None,
        fallback: Some(ToneSequence::Chime),
    },
    SoundEntry {
        id: SoundId::Silent,
        label: "Silent",
        asset: None,
        fallback: None,
    },
];

/// Every sound entry, in display order.
pub fn catalog() -> &'static [SoundEntry] {
    &CATALOG
}

/// The table row for a sound.
pub fn entry(id: SoundId) -> &'static SoundEntry {
    CATALOG
        .iter()
        .find(|e| e.id == id)
        .unwrap_or(&CATALOG[0])
}

/// Interface feedback sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    /// Countdown started or resumed.
    Start,
    /// Volume changed.
    Click,
}

/// What to attempt, in order: the file asset, then the tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub primary: Option<AssetRef>,
    pub fallback: Option<ToneSequence>,
}

impl Resolution {
    /// Returns true if there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.fallback.is_none()
    }
}

/// Resolution for a selected sound. Mute is not considered here.
pub fn resolution_for(sound: SoundId, selection: &AlarmSelection) -> Resolution {
    let row = entry(sound);
    let primary = match sound {
        SoundId::Custom => selection.custom_audio.clone().map(AssetRef::File),
        _ => row.asset.map(AssetRef::Bundled),
    };
    Resolution {
        primary,
        fallback: row.fallback,
    }
}

/// Resolution for an interface cue.
pub fn cue_resolution(cue: Cue) -> Resolution {
    let asset = match cue {
        Cue::Start => "start.mp3",
        Cue::Click => "click.mp3",
    };
    Resolution {
        primary: Some(AssetRef::Bundled(asset)),
        fallback: Some(ToneSequence::Beep),
    }
}
