// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Shared tempo handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{NoteValue, TransportError};

/// Tempo in BPM shared between the user thread and the timing thread
///
/// Cloning yields another handle to the same value. The engine accepts any
/// positive finite BPM; range limits belong to the UI.
#[derive(Debug, Clone)]
pub struct Tempo {
    bits: Arc<AtomicU64>,
}

impl Tempo {
    /// Create a tempo handle
    pub fn new(bpm: f64) -> Result<Self, TransportError> {
        let bpm = validate_bpm(bpm)?;
        Ok(Self {
            bits: Arc::new(AtomicU64::new(bpm.to_bits())),
        })
    }

    /// Current tempo in BPM
    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Change the tempo; readers see it on their next read
    pub fn set(&self, bpm: f64) -> Result<(), TransportError> {
        let bpm = validate_bpm(bpm)?;
        self.bits.store(bpm.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Length of one beat at the current tempo
    pub fn beat_duration(&self) -> Duration {
        NoteValue::Quarter.duration_at(self.bpm())
    }

    /// Length of a note value at the current tempo
    pub fn interval(&self, value: NoteValue) -> Duration {
        value.duration_at(self.bpm())
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(120.0f64.to_bits())),
        }
    }
}

/// Check that a BPM value is usable
pub fn validate_bpm(bpm: f64) -> Result<f64, TransportError> {
    if bpm.is_finite() && bpm > 0.0 {
        Ok(bpm)
    } else {
        Err(TransportError::InvalidTempo(bpm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_shared_between_clones() {
        let tempo = Tempo::new(90.0).unwrap();
        let other = tempo.clone();
        other.set(140.0).unwrap();
        assert_eq!(tempo.bpm(), 140.0);
    }

    #[test]
    fn test_tempo_rejects_invalid() {
        assert!(Tempo::new(0.0).is_err());
        assert!(Tempo::new(-10.0).is_err());
        assert!(Tempo::new(f64::NAN).is_err());
        assert!(Tempo::new(f64::INFINITY).is_err());

        let tempo = Tempo::new(100.0).unwrap();
        assert!(tempo.set(0.0).is_err());
        assert_eq!(tempo.bpm(), 100.0);
    }

    #[test]
    fn test_no_ui_bounds_in_engine() {
        // The UI slider is 60-160; the engine accepts anything positive
        assert_eq!(Tempo::new(20.0).unwrap().bpm(), 20.0);
        assert_eq!(Tempo::new(400.0).unwrap().bpm(), 400.0);
    }

    #[test]
    fn test_beat_duration() {
        let tempo = Tempo::new(120.0).unwrap();
        assert_eq!(tempo.beat_duration(), Duration::from_millis(500));
        assert_eq!(tempo.interval(NoteValue::Half), Duration::from_secs(1));
    }
}
