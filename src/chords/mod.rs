// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord vocabulary for chordflow.
//!
//! This module provides the chord label dictionary, pitch-name parsing and
//! the short mood descriptions shown next to each chord selector.

pub mod dictionary;
pub mod pitch;

pub use dictionary::{ChordDictionary, NoteSet};
pub use pitch::{MidiNote, Pitch, PitchClass};

use thiserror::Error;

/// Symbolic chord name, a key into the [`ChordDictionary`]
pub type ChordLabel = String;

/// Chord vocabulary errors
#[derive(Debug, Error)]
pub enum ChordError {
    #[error("invalid pitch name: {0:?}")]
    InvalidPitch(String),
    #[error("pitch outside the MIDI range: {0:?}")]
    PitchOutOfRange(String),
    #[error("chord label is empty")]
    EmptyLabel,
    #[error("failed to read chord table: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse chord table: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Short description of how a chord tends to feel
pub fn describe(label: &str) -> &'static str {
    if label.contains("Maj7") {
        "Dreamy, nostalgic, jazz color"
    } else if label.contains("Min7") {
        "Mellow, smooth, soulful"
    } else if label.contains("Min") {
        "Sad, serious, emotional"
    } else if label.contains("Maj") {
        "Happy, bright, stable"
    } else if label.contains("Dim") {
        "Tense, dissonant, suspenseful"
    } else if label.contains('7') {
        "Unstable, bluesy, wants resolution"
    } else {
        "Harmonic chord structure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_quality_precedence() {
        assert_eq!(describe("C Maj7"), "Dreamy, nostalgic, jazz color");
        assert_eq!(describe("A Min7"), "Mellow, smooth, soulful");
        assert_eq!(describe("A Min"), "Sad, serious, emotional");
        assert_eq!(describe("F Maj"), "Happy, bright, stable");
        assert_eq!(describe("B Dim"), "Tense, dissonant, suspenseful");
        assert_eq!(describe("G 7"), "Unstable, bluesy, wants resolution");
        assert_eq!(describe("C Sus4"), "Harmonic chord structure");
    }
}
