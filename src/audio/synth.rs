// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Polyphonic triangle-wave synthesizer.
//!
//! Each note holds for a given number of samples, then enters release.
//! Output is the dry voice mix plus reverb and chorus sends, rendered into
//! interleaved buffers for the audio callback.

use std::time::Duration;

use super::effects::{Chorus, ChorusParams, Reverb};
use super::envelope::{Envelope, EnvelopeParams};
use crate::chords::MidiNote;

/// Maximum simultaneous voices
pub const MAX_VOICES: usize = 32;

/// Convert decibels to linear gain
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Synth settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParams {
    pub envelope: EnvelopeParams,
    pub volume_db: f32,
    pub reverb: bool,
    pub reverb_decay: f32,
    pub chorus: Option<ChorusParams>,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            envelope: EnvelopeParams::default(),
            volume_db: -10.0,
            reverb: true,
            reverb_decay: 2.0,
            chorus: Some(ChorusParams::default()),
        }
    }
}

/// One oscillator slot
struct SynthVoice {
    note: MidiNote,
    phase: f32,
    phase_step: f32,
    envelope: Envelope,
    hold_remaining: u64,
    age: u64,
}

impl SynthVoice {
    fn new(params: EnvelopeParams, sample_rate: f32) -> Self {
        Self {
            note: 0,
            phase: 0.0,
            phase_step: 0.0,
            envelope: Envelope::new(params, sample_rate),
            hold_remaining: 0,
            age: 0,
        }
    }

    fn start(&mut self, note: MidiNote, frequency: f32, hold: u64, age: u64, sample_rate: f32) {
        if self.note != note || !self.envelope.is_active() {
            self.phase = 0.0;
        }
        self.note = note;
        self.phase_step = frequency / sample_rate;
        self.hold_remaining = hold;
        self.age = age;
        self.envelope.trigger();
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if !self.envelope.is_active() {
            return 0.0;
        }
        if self.hold_remaining > 0 {
            self.hold_remaining -= 1;
            if self.hold_remaining == 0 {
                self.envelope.release();
            }
        }
        // Triangle from phase in 0..1
        let tri = 1.0 - 4.0 * (self.phase - 0.5).abs();
        self.phase = (self.phase + self.phase_step).fract();
        tri * self.envelope.next_sample()
    }
}

/// Polyphonic synthesizer with ambience sends
pub struct PolySynth {
    voices: Vec<SynthVoice>,
    sample_rate: f32,
    gain: f32,
    reverb: Option<Reverb>,
    chorus: Option<Chorus>,
    age_counter: u64,
}

impl PolySynth {
    /// Create a synth with default settings
    pub fn new(sample_rate: f32) -> Self {
        Self::with_params(SynthParams::default(), sample_rate)
    }

    /// Create a synth with custom settings
    pub fn with_params(params: SynthParams, sample_rate: f32) -> Self {
        Self {
            voices: (0..MAX_VOICES)
                .map(|_| SynthVoice::new(params.envelope, sample_rate))
                .collect(),
            sample_rate,
            gain: db_to_gain(params.volume_db),
            reverb: params
                .reverb
                .then(|| Reverb::new(params.reverb_decay, sample_rate)),
            chorus: params.chorus.map(|c| Chorus::new(c, sample_rate)),
            age_counter: 0,
        }
    }

    /// Start a note that releases after `hold`
    pub fn note_on(&mut self, note: MidiNote, frequency: f32, hold: Duration) {
        self.age_counter = self.age_counter.wrapping_add(1);
        let hold_samples = ((hold.as_secs_f64() * self.sample_rate as f64).round() as u64).max(1);
        let index = self.free_voice().unwrap_or_else(|| self.voice_to_steal());
        let (age, sample_rate) = (self.age_counter, self.sample_rate);
        self.voices[index].start(note, frequency, hold_samples, age, sample_rate);
    }

    /// Put every sounding voice into release
    pub fn release_all(&mut self) {
        for voice in &mut self.voices {
            voice.hold_remaining = 0;
            voice.envelope.release();
        }
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.envelope.is_active()).count()
    }

    #[cfg(test)]
    fn releasing_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.envelope.is_releasing()).count()
    }

    /// Notes currently held (not yet releasing)
    #[cfg(test)]
    fn held_notes(&self) -> Vec<MidiNote> {
        self.voices
            .iter()
            .filter(|v| v.envelope.is_active() && !v.envelope.is_releasing())
            .map(|v| v.note)
            .collect()
    }

    fn free_voice(&self) -> Option<usize> {
        self.voices.iter().position(|v| !v.envelope.is_active())
    }

    /// Releasing voices first, then the oldest
    fn voice_to_steal(&self) -> usize {
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| (!v.envelope.is_releasing(), v.age))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Render one mono sample
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let dry: f32 = self.voices.iter_mut().map(SynthVoice::next_sample).sum::<f32>() * 0.25;
        let mut out = dry;
        if let Some(reverb) = self.reverb.as_mut() {
            out += reverb.process(dry);
        }
        if let Some(chorus) = self.chorus.as_mut() {
            out += 0.5 * chorus.process(dry);
        }
        out * self.gain
    }

    /// Render into an interleaved buffer, adding to what is there
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in buffer.chunks_mut(channels) {
            let sample = self.next_sample();
            for out in frame.iter_mut() {
                *out += sample;
            }
        }
    }
}
