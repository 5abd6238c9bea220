// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pitch names and their MIDI / frequency equivalents.
//!
//! Chord voicings are stored as scientific pitch names ("C4", "Eb4",
//! "F#5"). This module turns them into MIDI note numbers for export and
//! into frequencies for the synth.

use std::fmt;
use std::str::FromStr;

use super::ChordError;

/// MIDI note number type (0-127)
pub type MidiNote = u8;

/// Pitch classes, sharps used as the canonical spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    Cs, // C# / Db
    D,
    Ds, // D# / Eb
    E,
    F,
    Fs, // F# / Gb
    G,
    Gs, // G# / Ab
    A,
    As, // A# / Bb
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitone offset from C (0-11)
    pub fn semitone(self) -> u8 {
        match self {
            PitchClass::C => 0,
            PitchClass::Cs => 1,
            PitchClass::D => 2,
            PitchClass::Ds => 3,
            PitchClass::E => 4,
            PitchClass::F => 5,
            PitchClass::Fs => 6,
            PitchClass::G => 7,
            PitchClass::Gs => 8,
            PitchClass::A => 9,
            PitchClass::As => 10,
            PitchClass::B => 11,
        }
    }

    /// Pitch class from a semitone offset
    pub fn from_semitone(semitone: u8) -> Self {
        PitchClass::ALL[(semitone % 12) as usize]
    }

    /// Parse a pitch class name ("C", "C#", "Db", "Bb")
    ///
    /// Enharmonic spellings that cross the octave boundary ("Cb", "B#")
    /// are not accepted here since they change the octave number.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "C" => Some(PitchClass::C),
            "C#" | "Db" => Some(PitchClass::Cs),
            "D" => Some(PitchClass::D),
            "D#" | "Eb" => Some(PitchClass::Ds),
            "E" | "Fb" => Some(PitchClass::E),
            "F" | "E#" => Some(PitchClass::F),
            "F#" | "Gb" => Some(PitchClass::Fs),
            "G" => Some(PitchClass::G),
            "G#" | "Ab" => Some(PitchClass::Gs),
            "A" => Some(PitchClass::A),
            "A#" | "Bb" => Some(PitchClass::As),
            "B" => Some(PitchClass::B),
            _ => None,
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        };
        f.write_str(name)
    }
}

/// A pitch class in a specific octave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    class: PitchClass,
    midi: MidiNote,
}

impl Pitch {
    /// Build a pitch from a MIDI note number
    pub fn from_midi(midi: MidiNote) -> Self {
        Self {
            class: PitchClass::from_semitone(midi % 12),
            midi: midi.min(127),
        }
    }

    /// Pitch class
    pub fn class(&self) -> PitchClass {
        self.class
    }

    /// Octave number, C4 = middle C
    pub fn octave(&self) -> i8 {
        (self.midi / 12) as i8 - 1
    }

    /// MIDI note number
    pub fn midi(&self) -> MidiNote {
        self.midi
    }

    /// Frequency in Hz, A4 = 440
    pub fn frequency(&self) -> f32 {
        440.0 * 2f32.powf((self.midi as f32 - 69.0) / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = ChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChordError::InvalidPitch(s.to_string());
        let name = s.trim();

        // Octave digits (with optional minus sign) start after the letter
        // and its accidental.
        let split = name
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(invalid)?;

        let (class_name, octave_str) = name.split_at(split);
        let class = PitchClass::parse(class_name).ok_or_else(invalid)?;
        let octave: i32 = octave_str.parse().map_err(|_| invalid())?;

        let midi = octave
            .checked_add(1)
            .and_then(|o| o.checked_mul(12))
            .and_then(|m| m.checked_add(class.semitone() as i32))
            .filter(|m| (0..=127).contains(m))
            .ok_or_else(|| ChordError::PitchOutOfRange(name.to_string()))?;

        Ok(Self {
            class,
            midi: midi as MidiNote,
        })
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c() {
        let pitch: Pitch = "C4".parse().unwrap();
        assert_eq!(pitch.midi(), 60);
        assert_eq!(pitch.octave(), 4);
        assert_eq!(pitch.class(), PitchClass::C);
    }

    #[test]
    fn test_accidentals() {
        assert_eq!("Eb4".parse::<Pitch>().unwrap().midi(), 63);
        assert_eq!("D#4".parse::<Pitch>().unwrap().midi(), 63);
        assert_eq!("F#4".parse::<Pitch>().unwrap().midi(), 66);
        assert_eq!("Bb4".parse::<Pitch>().unwrap().midi(), 70);
        assert_eq!("C#5".parse::<Pitch>().unwrap().midi(), 73);
    }

    #[test]
    fn test_low_octaves() {
        assert_eq!("C0".parse::<Pitch>().unwrap().midi(), 12);
        assert_eq!("C-1".parse::<Pitch>().unwrap().midi(), 0);
        assert!(matches!(
            "C-2".parse::<Pitch>(),
            Err(ChordError::PitchOutOfRange(_))
        ));
        assert!(matches!(
            "A9".parse::<Pitch>(),
            Err(ChordError::PitchOutOfRange(_))
        ));
        assert!(matches!(
            "C2147483647".parse::<Pitch>(),
            Err(ChordError::PitchOutOfRange(_))
        ));
    }

    #[test]
    fn test_invalid_names() {
        assert!("".parse::<Pitch>().is_err());
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("Cx4".parse::<Pitch>().is_err());
        assert!("4".parse::<Pitch>().is_err());
    }

    #[test]
    fn test_frequency() {
        let a4: Pitch = "A4".parse().unwrap();
        assert!((a4.frequency() - 440.0).abs() < 0.001);

        let a5: Pitch = "A5".parse().unwrap();
        assert!((a5.frequency() - 880.0).abs() < 0.01);
    }

    #[test]
    fn test_display_uses_sharps() {
        let pitch: Pitch = "Db4".parse().unwrap();
        assert_eq!(pitch.to_string(), "C#4");
        assert_eq!(Pitch::from_midi(69).to_string(), "A4");
    }

    #[test]
    fn test_pitch_class_round_trip() {
        for pc in PitchClass::ALL {
            assert_eq!(PitchClass::from_semitone(pc.semitone()), pc);
            assert_eq!(PitchClass::parse(&pc.to_string()), Some(pc));
        }
    }
}
