// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Progression export.
//!
//! This module provides:
//! - Conversion of a progression range into an absolute-time note timeline
//! - Standard MIDI file writing

pub mod smf;
pub mod timeline;

pub use smf::{velocity_byte, SmfWriter, DEFAULT_PPQN};
pub use timeline::{export_range, export_range_with_velocity, NoteEvent, Timeline, EXPORT_VELOCITY};

use thiserror::Error;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid tempo {0} BPM; must be positive and finite")]
    InvalidTempo(f64),
    #[error("invalid velocity {0}; must be between 0.0 and 1.0")]
    InvalidVelocity(f64),
    #[error("invalid pitch in timeline: {0:?}")]
    InvalidPitch(String),
    #[error("failed to write MIDI file: {0}")]
    Io(#[from] std::io::Error),
}
