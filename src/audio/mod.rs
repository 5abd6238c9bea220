// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio engine for chordflow.
//!
//! This module provides:
//! - The `Voice` trait the playback controller sounds chords through
//! - A polyphonic triangle synth with reverb and chorus
//! - Audio output via cpal

pub mod effects;
pub mod envelope;
pub mod output;
pub mod synth;
pub mod voice;

pub use envelope::EnvelopeParams;
pub use output::{AudioConfig, AudioOutput};
pub use synth::{db_to_gain, PolySynth, SynthParams};
pub use voice::InstrumentVoice;

use std::time::Duration;

use thiserror::Error;

use crate::chords::NoteSet;

/// Pitch sounded to wake the audio output
pub const WAKE_PITCH: &str = "C0";
/// Length of the wake note (a 32nd note at 120 BPM)
pub const WAKE_DURATION: Duration = Duration::from_micros(62_500);

/// Audio error types
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio initialization failed: {0}")]
    InitFailed(String),
    #[error("audio stream failed: {0}")]
    StreamFailed(String),
    #[error("invalid pitch {0:?}")]
    InvalidPitch(String),
}

/// A polyphonic sound source
///
/// Overlapping triggers layer rather than cut each other off.
pub trait Voice: Send + Sync {
    /// Sound every note at once, releasing together after `duration`
    fn sound_chord(&self, notes: &NoteSet, duration: Duration) -> Result<(), AudioError>;

    /// Sound a single pitch name such as `"E4"`
    fn sound_note(&self, pitch: &str, duration: Duration) -> Result<(), AudioError>;

    /// Put every sounding note into release; idempotent
    fn release_all(&self);

    /// Make sure output is live before timed playback begins
    ///
    /// Returns once the audio graph is running.
    fn unlock(&self) -> Result<(), AudioError> {
        self.sound_note(WAKE_PITCH, WAKE_DURATION)
    }
}
