// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the transport clock that drives loop playback,
//! the shared tempo, musical duration tokens and the one-shot timer used
//! for preview highlights.

pub mod clock;
pub mod manual;
pub mod note_value;
pub mod tempo;
pub mod timer;

pub use clock::{Tick, TickCallback, Transport, TransportClock};
pub use manual::ManualTransport;
pub use note_value::NoteValue;
pub use tempo::{validate_bpm, Tempo};
pub use timer::DeferredTimer;

use std::time::Duration;

use thiserror::Error;

/// Transport and timing errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is already running; dispose it before starting again")]
    AlreadyRunning,
    #[error("invalid tempo {0} BPM; must be positive and finite")]
    InvalidTempo(f64),
    #[error("unknown note value {0:?}")]
    InvalidNoteValue(String),
    #[error("failed to spawn timing thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Seconds to a `Duration`, saturating instead of panicking
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds <= 0.0 || seconds.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
