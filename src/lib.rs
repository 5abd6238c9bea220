// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! chordflow - chord progression sequencer.
//!
//! Pick chords for four or eight slots, audition them through a small
//! synthesized instrument, loop them in time and export them as a
//! Standard MIDI File.

pub mod audio;
pub mod chords;
pub mod config;
pub mod export;
pub mod playback;
pub mod progression;
pub mod suggest;
pub mod timing;
pub mod ui;

pub use chords::{ChordDictionary, ChordLabel, NoteSet};
pub use config::ChordflowConfig;
pub use playback::{PlaybackController, PlaybackState};
pub use progression::{LoopMode, Progression, SlotLayout};
