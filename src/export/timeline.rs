// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Absolute-time note timelines built from a progression.

use tracing::debug;

use super::ExportError;
use crate::chords::ChordDictionary;
use crate::progression::Progression;
use crate::timing::validate_bpm;

/// Velocity of every exported note, as a fraction of full scale
pub const EXPORT_VELOCITY: f64 = 0.75;

/// One exported note
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Progression slot the note came from
    pub slot: usize,
    /// Pitch name, e.g. `"C4"`
    pub pitch: String,
    /// Start time in seconds from the beginning of the export
    pub start: f64,
    /// Length in seconds
    pub duration: f64,
    /// Velocity in 0.0..=1.0
    pub velocity: f64,
}

impl NoteEvent {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Ordered note events plus the tempo they were rendered at
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    bpm: f64,
    events: Vec<NoteEvent>,
}

impl Timeline {
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Events ordered by slot, then by voicing order
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last note in seconds
    pub fn end_time(&self) -> f64 {
        self.events.iter().map(NoteEvent::end).fold(0.0, f64::max)
    }

    /// Events that came from one slot
    pub fn slot_events(&self, slot: usize) -> impl Iterator<Item = &NoteEvent> {
        self.events.iter().filter(move |e| e.slot == slot)
    }

    /// Group pitch names by start time, in time order
    ///
    /// Slots that produced no events do not appear.
    pub fn group_by_start(&self) -> Vec<(f64, Vec<String>)> {
        let mut groups: Vec<(f64, Vec<String>)> = Vec::new();
        for event in &self.events {
            match groups.last_mut() {
                Some((start, pitches)) if *start == event.start => {
                    pitches.push(event.pitch.clone());
                }
                _ => groups.push((event.start, vec![event.pitch.clone()])),
            }
        }
        groups
    }
}

/// Render `count` slots starting at `start`, one beat per slot
///
/// The range is clamped to the progression. Labels missing from the
/// dictionary produce no events for their slot.
pub fn export_range(
    progression: &Progression,
    dictionary: &ChordDictionary,
    start: usize,
    count: usize,
    bpm: f64,
) -> Result<Timeline, ExportError> {
    export_range_with_velocity(progression, dictionary, start, count, bpm, EXPORT_VELOCITY)
}

/// Same as [`export_range`] with an explicit note velocity
pub fn export_range_with_velocity(
    progression: &Progression,
    dictionary: &ChordDictionary,
    start: usize,
    count: usize,
    bpm: f64,
    velocity: f64,
) -> Result<Timeline, ExportError> {
    let bpm = validate_bpm(bpm).map_err(|_| ExportError::InvalidTempo(bpm))?;
    if !(0.0..=1.0).contains(&velocity) {
        return Err(ExportError::InvalidVelocity(velocity));
    }
    let beat = 60.0 / bpm;

    let labels = progression.slice(start, count);
    let mut events = Vec::new();
    for (offset, label) in labels.iter().enumerate() {
        let slot_start = offset as f64 * beat;
        for pitch in dictionary.resolve(label).notes() {
            events.push(NoteEvent {
                slot: start + offset,
                pitch: pitch.clone(),
                start: slot_start,
                duration: beat,
                velocity,
            });
        }
    }

    debug!(start, slots = labels.len(), events = events.len(), bpm, "timeline rendered");
    Ok(Timeline { bpm, events })
}
