// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fixed-length chord progressions and the slot ranges loops iterate.
//!
//! A progression has either four or eight slots. It is never resized once
//! created; playback modes select sub-ranges of it instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chords::ChordLabel;

/// The eight-slot progression a new session starts with
pub const DEFAULT_PROGRESSION: [&str; 8] = [
    "C Maj", "A Min", "F Maj", "G Maj", "E Min", "A Min", "D Min", "G 7",
];

/// Slots per row in the eight-slot layout
pub const ROW_LENGTH: usize = 4;

/// Progression errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    #[error("slot {index} out of range for a {len}-slot progression")]
    SlotOutOfRange { index: usize, len: usize },
    #[error("expected {expected} chords, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("loop mode {0} is not available in this layout")]
    ModeUnavailable(LoopMode),
}

/// Number of slots in the arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotLayout {
    /// Four slots, one row, only the full loop
    Four,
    /// Eight slots in two rows, row loops and the full loop
    #[default]
    Eight,
}

impl SlotLayout {
    /// Number of slots
    pub fn len(self) -> usize {
        match self {
            SlotLayout::Four => 4,
            SlotLayout::Eight => 8,
        }
    }

    /// Loop modes offered by this layout
    pub fn loop_modes(self) -> &'static [LoopMode] {
        match self {
            SlotLayout::Four => &[LoopMode::All],
            SlotLayout::Eight => &[LoopMode::RowA, LoopMode::RowB, LoopMode::All],
        }
    }

    /// Slot range a loop mode iterates in this layout
    pub fn range_for(self, mode: LoopMode) -> Result<SlotRange, ProgressionError> {
        match (self, mode) {
            (_, LoopMode::All) => Ok(SlotRange::new(0, self.len())),
            (SlotLayout::Eight, LoopMode::RowA) => Ok(SlotRange::new(0, ROW_LENGTH)),
            (SlotLayout::Eight, LoopMode::RowB) => Ok(SlotRange::new(ROW_LENGTH, ROW_LENGTH)),
            (SlotLayout::Four, mode) => Err(ProgressionError::ModeUnavailable(mode)),
        }
    }
}

/// Which slots a loop plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopMode {
    /// First row (slots 0-3)
    RowA,
    /// Second row (slots 4-7)
    RowB,
    /// Every slot
    All,
}

impl LoopMode {
    /// Export filename the UI uses for this range
    pub fn export_filename(self) -> &'static str {
        match self {
            LoopMode::RowA => "row-1.mid",
            LoopMode::RowB => "row-2.mid",
            LoopMode::All => "full-progression.mid",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::RowA => write!(f, "row1"),
            LoopMode::RowB => write!(f, "row2"),
            LoopMode::All => write!(f, "all"),
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "row1" | "row-1" | "a" | "row_a" => Ok(LoopMode::RowA),
            "row2" | "row-2" | "b" | "row_b" => Ok(LoopMode::RowB),
            "all" | "full" => Ok(LoopMode::All),
            other => Err(format!("unknown loop mode: {}", other)),
        }
    }
}

/// Half-open slot range `[start, start + len)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    pub start: usize,
    pub len: usize,
}

impl SlotRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last slot
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Check if a slot falls inside the range
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }

    /// Slot played on a given step of a loop over this range
    pub fn slot_for_step(&self, step: u64) -> usize {
        if self.len == 0 {
            return self.start;
        }
        self.start + (step % self.len as u64) as usize
    }
}

/// Fixed-length ordered chord labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progression {
    slots: Vec<ChordLabel>,
}

impl Progression {
    /// Default progression for a layout
    pub fn default_for(layout: SlotLayout) -> Self {
        Self {
            slots: DEFAULT_PROGRESSION
                .iter()
                .take(layout.len())
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Build a progression whose length must match the layout
    pub fn from_labels<I, S>(layout: SlotLayout, labels: I) -> Result<Self, ProgressionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots: Vec<ChordLabel> = labels.into_iter().map(Into::into).collect();
        if slots.len() != layout.len() {
            return Err(ProgressionError::WrongLength {
                expected: layout.len(),
                actual: slots.len(),
            });
        }
        Ok(Self { slots })
    }

    /// Layout matching this progression's length
    pub fn layout(&self) -> SlotLayout {
        if self.slots.len() == SlotLayout::Four.len() {
            SlotLayout::Four
        } else {
            SlotLayout::Eight
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Chord label in a slot
    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(String::as_str)
    }

    /// Replace the chord in one slot
    pub fn set(&mut self, index: usize, label: impl Into<String>) -> Result<(), ProgressionError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ProgressionError::SlotOutOfRange { index, len })?;
        *slot = label.into();
        Ok(())
    }

    /// Replace every slot at once; the length must not change
    pub fn replace_all<I, S>(&mut self, labels: I) -> Result<(), ProgressionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replacement = Self::from_labels(self.layout(), labels)?;
        self.slots = replacement.slots;
        Ok(())
    }

    /// Labels in a range, clamped to the progression like a slice
    pub fn slice(&self, start: usize, count: usize) -> &[ChordLabel] {
        let start = start.min(self.slots.len());
        let end = start.saturating_add(count).min(self.slots.len());
        &self.slots[start..end]
    }

    /// All labels in slot order
    pub fn labels(&self) -> &[ChordLabel] {
        &self.slots
    }
}

impl Default for Progression {
    fn default() -> Self {
        Self::default_for(SlotLayout::default())
    }
}
