// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback engine for chordflow.
//!
//! This module provides:
//! - The playback controller state machine (idle, preview, row and full loops)
//! - The draw-synchronized highlight channel

pub mod controller;
pub mod highlight;

pub use controller::{PlaybackController, PlaybackOptions, PlaybackState};
pub use highlight::{HighlightReceiver, HighlightSender, HighlightUpdate};

use thiserror::Error;

use crate::audio::AudioError;
use crate::progression::ProgressionError;
use crate::timing::TransportError;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Progression(#[from] ProgressionError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
