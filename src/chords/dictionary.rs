// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord label to note set lookup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{ChordError, Pitch};

/// Ordered pitch names forming one chord voicing
///
/// Order is not meaningful for sound but is kept for export ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSet {
    notes: Vec<String>,
}

impl NoteSet {
    /// Create a note set, checking that every name parses as a pitch
    pub fn new<I, S>(notes: I) -> Result<Self, ChordError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let notes: Vec<String> = notes.into_iter().map(Into::into).collect();
        for name in &notes {
            name.parse::<Pitch>()?;
        }
        Ok(Self { notes })
    }

    /// The empty note set, sounded as silence
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pitch names in voicing order
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Parsed pitches in voicing order
    pub fn pitches(&self) -> impl Iterator<Item = Pitch> + '_ {
        // Names were validated on construction
        self.notes.iter().filter_map(|n| n.parse().ok())
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Built-in voicings, rooted in octave 4
const BUILTIN_CHORDS: &[(&str, &[&str])] = &[
    // C
    ("C Maj", &["C4", "E4", "G4"]),
    ("C Min", &["C4", "Eb4", "G4"]),
    ("C 7", &["C4", "E4", "G4", "Bb4"]),
    ("C Maj7", &["C4", "E4", "G4", "B4"]),
    // Db / C#
    ("Db Maj", &["Db4", "F4", "Ab4"]),
    ("Db Min", &["Db4", "E4", "Ab4"]),
    // D
    ("D Maj", &["D4", "F#4", "A4"]),
    ("D Min", &["D4", "F4", "A4"]),
    ("D 7", &["D4", "F#4", "A4", "C5"]),
    ("D Min7", &["D4", "F4", "A4", "C5"]),
    // Eb
    ("Eb Maj", &["Eb4", "G4", "Bb4"]),
    ("Eb Min", &["Eb4", "Gb4", "Bb4"]),
    // E
    ("E Maj", &["E4", "G#4", "B4"]),
    ("E Min", &["E4", "G4", "B4"]),
    ("E 7", &["E4", "G#4", "B4", "D5"]),
    // F
    ("F Maj", &["F4", "A4", "C5"]),
    ("F Min", &["F4", "Ab4", "C5"]),
    ("F Maj7", &["F4", "A4", "C5", "E5"]),
    // F# / Gb
    ("F# Maj", &["F#4", "A#4", "C#5"]),
    ("F# Min", &["F#4", "A4", "C#5"]),
    // G
    ("G Maj", &["G4", "B4", "D5"]),
    ("G Min", &["G4", "Bb4", "D5"]),
    ("G 7", &["G4", "B4", "D5", "F5"]),
    // Ab
    ("Ab Maj", &["Ab4", "C5", "Eb5"]),
    ("Ab Min", &["Ab4", "B4", "Eb5"]),
    // A
    ("A Maj", &["A4", "C#5", "E5"]),
    ("A Min", &["A4", "C5", "E5"]),
    ("A Min7", &["A4", "C5", "E5", "G5"]),
    // Bb
    ("Bb Maj", &["Bb4", "D5", "F5"]),
    ("Bb Min", &["Bb4", "Db5", "F5"]),
    // B
    ("B Maj", &["B4", "D#5", "F#5"]),
    ("B Min", &["B4", "D5", "F#5"]),
    ("B Dim", &["B4", "D5", "F5"]),
];

/// Static mapping from chord label to note set
///
/// Immutable once handed to the playback engine; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ChordDictionary {
    chords: BTreeMap<String, NoteSet>,
}

impl ChordDictionary {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary holding the built-in chord table
    pub fn builtin() -> Self {
        let chords = BUILTIN_CHORDS
            .iter()
            .map(|(label, notes)| {
                let notes = NoteSet {
                    notes: notes.iter().map(|n| n.to_string()).collect(),
                };
                (label.to_string(), notes)
            })
            .collect();
        Self { chords }
    }

    /// Parse a YAML chord table (`label: [pitch, ...]`)
    pub fn from_yaml(yaml: &str) -> Result<Self, ChordError> {
        let table: BTreeMap<String, Vec<String>> = serde_yaml::from_str(yaml)?;
        let mut dictionary = Self::new();
        for (label, notes) in table {
            dictionary.insert(label, notes)?;
        }
        Ok(dictionary)
    }

    /// Load a YAML chord table from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChordError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Add or replace a chord, validating its pitch names
    pub fn insert<I, S>(&mut self, label: impl Into<String>, notes: I) -> Result<(), ChordError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ChordError::EmptyLabel);
        }
        let notes = NoteSet::new(notes)?;
        self.chords.insert(label, notes);
        Ok(())
    }

    /// Merge another dictionary into this one, its entries winning
    pub fn extend(&mut self, other: ChordDictionary) {
        self.chords.extend(other.chords);
    }

    /// Note set for a label; empty for unknown labels
    pub fn resolve(&self, label: &str) -> NoteSet {
        self.chords.get(label).cloned().unwrap_or_default()
    }

    /// Check if a label is known
    pub fn contains(&self, label: &str) -> bool {
        self.chords.contains_key(label)
    }

    /// Known label matching ignoring ASCII case
    pub fn find_case_insensitive(&self, label: &str) -> Option<&str> {
        let wanted = label.trim();
        self.chords
            .keys()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .map(String::as_str)
    }

    /// Known labels, sorted
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.chords.keys().map(String::as_str)
    }

    /// Known labels as an owned, sorted list
    pub fn available_chords(&self) -> Vec<String> {
        self.chords.keys().cloned().collect()
    }

    /// Pick `count` labels uniformly at random (with repeats)
    pub fn random_labels<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        let labels: Vec<&String> = self.chords.keys().collect();
        (0..count)
            .filter_map(|_| labels.choose(rng).map(|l| (*l).clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_builtin_table() {
        let dict = ChordDictionary::builtin();
        assert_eq!(dict.len(), 33);
        assert_eq!(dict.resolve("C Maj").notes(), &["C4", "E4", "G4"]);
        assert_eq!(dict.resolve("G 7").notes(), &["G4", "B4", "D5", "F5"]);
    }

    #[test]
    fn test_builtin_pitches_parse() {
        let dict = ChordDictionary::builtin();
        for label in dict.labels() {
            let notes = dict.resolve(label);
            assert!(!notes.is_empty(), "{} has no notes", label);
            assert_eq!(notes.pitches().count(), notes.len(), "{}", label);
        }
    }

    #[test]
    fn test_unknown_label_is_empty() {
        let dict = ChordDictionary::builtin();
        assert!(dict.resolve("NotAChord").is_empty());
        assert!(!dict.contains("NotAChord"));
    }

    #[test]
    fn test_voicing_order_preserved() {
        let mut dict = ChordDictionary::new();
        dict.insert("Spread", ["G4", "C4", "E5"]).unwrap();
        assert_eq!(dict.resolve("Spread").notes(), &["G4", "C4", "E5"]);
    }

    #[test]
    fn test_insert_rejects_bad_pitch() {
        let mut dict = ChordDictionary::new();
        assert!(matches!(
            dict.insert("Broken", ["C4", "X9"]),
            Err(ChordError::InvalidPitch(_))
        ));
        assert!(matches!(dict.insert("  ", ["C4"]), Err(ChordError::EmptyLabel)));
        assert!(dict.is_empty());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let dict = ChordDictionary::builtin();
        assert_eq!(dict.find_case_insensitive("a min7"), Some("A Min7"));
        assert_eq!(dict.find_case_insensitive(" F# MAJ "), Some("F# Maj"));
        assert_eq!(dict.find_case_insensitive("H Maj"), None);
    }

    #[test]
    fn test_labels_sorted() {
        let dict = ChordDictionary::builtin();
        let labels = dict.available_chords();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
"C Sus4": [C4, F4, G4]
"C Add9": [C4, E4, G4, D5]
"#;
        let dict = ChordDictionary::from_yaml(yaml).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.resolve("C Sus4").notes(), &["C4", "F4", "G4"]);

        let mut merged = ChordDictionary::builtin();
        merged.extend(dict);
        assert!(merged.contains("C Add9"));
        assert!(merged.contains("C Maj"));
    }

    #[test]
    fn test_from_yaml_invalid_pitch() {
        let yaml = "\"Weird\": [C4, Q4]\n";
        assert!(ChordDictionary::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_random_labels_deterministic() {
        let dict = ChordDictionary::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        let first = dict.random_labels(4, &mut rng);
        let mut rng = StdRng::seed_from_u64(7);
        let second = dict.random_labels(4, &mut rng);

        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert!(first.iter().all(|l| dict.contains(l)));
    }
}
