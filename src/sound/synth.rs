//! Synthesized tone sequences.
//!
//! Each sequence renders to mono `f32` samples at [`SAMPLE_RATE`]. They are
//! the fallback when no sound file is available, so they must never fail.

use std::f32::consts::PI;
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Output sample rate for synthesized tones.
pub const SAMPLE_RATE: u32 = 44_100;

/// Peak amplitude of synthesized tones; kept low since oscillators are harsh.
const SYNTH_GAIN: f32 = 0.3;

/// Named tone sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToneSequence {
    /// Struck bell: a fundamental with inharmonic partials and a long decay.
    Bell,
    /// Four descending chime notes.
    Chime,
    /// Alternating two-tone siren.
    Urgent,
    /// Two percussive noise bursts.
    Bark,
    /// Short high beep used for interface cues.
    Beep,
}

impl ToneSequence {
    pub fn name(&self) -> &'static str {
        match self {
            ToneSequence::Bell => "bell",
            ToneSequence::Chime => "chime",
            ToneSequence::Urgent => "urgent",
            ToneSequence::Bark => "bark",
            ToneSequence::Beep => "beep",
        }
    }

    /// Length of one rendering of the sequence.
    pub fn duration(&self) -> Duration {
        let ms = match self {
            ToneSequence::Bell => 1600,
            ToneSequence::Chime => 4 * CHIME_NOTE_MS,
            ToneSequence::Urgent => 8 * URGENT_SEGMENT_MS,
            ToneSequence::Bark => 2 * BARK_BURST_MS + BARK_GAP_MS,
            ToneSequence::Beep => 100,
        };
        Duration::from_millis(ms)
    }

    /// Renders the sequence to mono samples in `[-1, 1]`.
    pub fn render(&self) -> Vec<f32> {
        let len = sample_count(self.duration());
        let mut samples: Vec<f32> = match self {
            ToneSequence::Bell => render_bell(len),
            ToneSequence::Chime => render_chime(len),
            ToneSequence::Urgent => render_urgent(len),
            ToneSequence::Bark => render_bark(len),
            ToneSequence::Beep => render_beep(len),
        };
        for s in &mut samples {
            *s = (*s * SYNTH_GAIN).clamp(-1.0, 1.0);
        }
        samples
    }
}

impl fmt::Display for ToneSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const CHIME_NOTE_MS: u64 = 350;
const URGENT_SEGMENT_MS: u64 = 125;
const BARK_BURST_MS: u64 = 140;
const BARK_GAP_MS: u64 = 110;

fn sample_count(duration: Duration) -> usize {
    (duration.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as usize
}

fn time_of(i: usize) -> f32 {
    i as f32 / SAMPLE_RATE as f32
}

fn sine(freq: f32, t: f32) -> f32 {
    (2.0 * PI * freq * t).sin()
}

/// Linear fade in/out to avoid clicks at segment edges.
fn edge_envelope(t: f32, len: f32, fade: f32) -> f32 {
    if t < fade {
        t / fade
    } else if t > len - fade {
        ((len - t) / fade).max(0.0)
    } else {
        1.0
    }
}

fn render_bell(len: usize) -> Vec<f32> {
    const FUNDAMENTAL: f32 = 523.25;
    const PARTIALS: [(f32, f32); 4] = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.25), (4.2, 0.15)];
    let norm: f32 = PARTIALS.iter().map(|(_, a)| a).sum();

    (0..len)
        .map(|i| {
            let t = time_of(i);
            let attack = (t / 0.005).min(1.0);
            let decay = (-3.0 * t).exp();
            let tone: f32 = PARTIALS
                .iter()
                .map(|(ratio, amp)| amp * sine(FUNDAMENTAL * ratio, t))
                .sum();
            tone / norm * attack * decay
        })
        .collect()
}

fn render_chime(len: usize) -> Vec<f32> {
    const NOTES: [f32; 4] = [1046.50, 880.00, 698.46, 523.25];
    let note_len = sample_count(Duration::from_millis(CHIME_NOTE_MS)).max(1);

    (0..len)
        .map(|i| {
            let note = NOTES[(i / note_len).min(NOTES.len() - 1)];
            let t = time_of(i % note_len);
            let attack = (t / 0.005).min(1.0);
            attack * (-6.0 * t).exp() * sine(note, t)
        })
        .collect()
}

fn render_urgent(len: usize) -> Vec<f32> {
    const TONES: [f32; 2] = [880.0, 660.0];
    let segment = sample_count(Duration::from_millis(URGENT_SEGMENT_MS)).max(1);
    let seg_secs = URGENT_SEGMENT_MS as f32 / 1000.0;

    (0..len)
        .map(|i| {
            let freq = TONES[(i / segment) % 2];
            let t = time_of(i % segment);
            // Odd harmonic gives the tone a buzzier edge than a pure sine.
            let wave = sine(freq, t) + 0.3 * sine(freq * 3.0, t);
            wave / 1.3 * edge_envelope(t, seg_secs, 0.008)
        })
        .collect()
}

fn render_bark(len: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(0x0B4C);
    let burst = sample_count(Duration::from_millis(BARK_BURST_MS));
    let gap = sample_count(Duration::from_millis(BARK_GAP_MS));

    (0..len)
        .map(|i| {
            let in_second = i >= burst + gap;
            let local = if in_second { i - burst - gap } else { i };
            if !in_second && i >= burst {
                return 0.0;
            }
            let t = time_of(local);
            let noise: f32 = rng.random_range(-1.0..1.0);
            let body = sine(if in_second { 160.0 } else { 190.0 }, t);
            (0.6 * noise + 0.4 * body) * (-22.0 * t).exp()
        })
        .collect()
}

fn render_beep(len: usize) -> Vec<f32> {
    let secs = len as f32 / SAMPLE_RATE as f32;
    (0..len)
        .map(|i| {
            let t = time_of(i);
            sine(880.0, t) * edge_envelope(t, secs, 0.005)
        })
        .collect()
}
