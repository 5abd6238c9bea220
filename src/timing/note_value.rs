// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Musical duration tokens ("4n", "8n", "2n.") relative to the tempo.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{seconds_to_duration, TransportError};

/// A note length expressed relative to the beat (quarter note = 1 beat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NoteValue {
    Whole,
    DottedHalf,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteValue {
    /// Length in beats
    pub fn beats(self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::DottedHalf => 3.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
            NoteValue::ThirtySecond => 0.125,
        }
    }

    /// Length in seconds at a tempo
    pub fn seconds_at(self, bpm: f64) -> f64 {
        self.beats() * 60.0 / bpm
    }

    /// Wall-clock length at a tempo
    pub fn duration_at(self, bpm: f64) -> Duration {
        seconds_to_duration(self.seconds_at(bpm))
    }

    /// Token form
    pub fn token(self) -> &'static str {
        match self {
            NoteValue::Whole => "1n",
            NoteValue::DottedHalf => "2n.",
            NoteValue::Half => "2n",
            NoteValue::Quarter => "4n",
            NoteValue::Eighth => "8n",
            NoteValue::Sixteenth => "16n",
            NoteValue::ThirtySecond => "32n",
        }
    }
}

impl FromStr for NoteValue {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1n" => Ok(NoteValue::Whole),
            "2n." => Ok(NoteValue::DottedHalf),
            "2n" => Ok(NoteValue::Half),
            "4n" => Ok(NoteValue::Quarter),
            "8n" => Ok(NoteValue::Eighth),
            "16n" => Ok(NoteValue::Sixteenth),
            "32n" => Ok(NoteValue::ThirtySecond),
            other => Err(TransportError::InvalidNoteValue(other.to_string())),
        }
    }
}

impl TryFrom<String> for NoteValue {
    type Error = TransportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteValue> for String {
    fn from(value: NoteValue) -> Self {
        value.token().to_string()
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
