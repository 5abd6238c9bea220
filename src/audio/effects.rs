// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Ambience effects for the instrument voice.
//!
//! A mono Freeverb network (parallel damped combs into series allpasses)
//! and an LFO-modulated delay chorus. Buffers are allocated up front and
//! nothing allocates while processing.

use std::f32::consts::TAU;

/// Damped feedback comb filter
struct Comb {
    buffer: Vec<f32>,
    index: usize,
    feedback: f32,
    damping: f32,
    store: f32,
}

impl Comb {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
            feedback: 0.5,
            damping: 0.2,
            store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.index];
        self.store = output * (1.0 - self.damping) + self.store * self.damping;
        self.buffer[self.index] = input + self.store * self.feedback;
        self.index = (self.index + 1) % self.buffer.len();
        output
    }
}

struct Allpass {
    buffer: Vec<f32>,
    index: usize,
}

impl Allpass {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * 0.5;
        self.index = (self.index + 1) % self.buffer.len();
        delayed - input
    }
}

/// Mono Freeverb-style reverb returning the wet signal only
pub struct Reverb {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    gain: f32,
}

impl Reverb {
    // Tunings are in samples at 44.1kHz
    const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
    const ALLPASS_TUNINGS: [usize; 2] = [556, 441];
    const SCALE_ROOM: f32 = 0.28;
    const OFFSET_ROOM: f32 = 0.7;
    const SCALE_DAMPING: f32 = 0.4;
    const FIXED_GAIN: f32 = 0.015;

    /// Create a reverb whose tail lasts roughly `decay_secs`
    pub fn new(decay_secs: f32, sample_rate: f32) -> Self {
        let scale = sample_rate / 44100.0;
        let mut reverb = Self {
            combs: Self::COMB_TUNINGS
                .iter()
                .map(|&t| Comb::new((t as f32 * scale) as usize))
                .collect(),
            allpasses: Self::ALLPASS_TUNINGS
                .iter()
                .map(|&t| Allpass::new((t as f32 * scale) as usize))
                .collect(),
            gain: Self::FIXED_GAIN,
        };
        reverb.set_decay(decay_secs);
        reverb
    }

    /// Map a decay time onto the room size; 0.5s is a small room, 4s the largest
    pub fn set_decay(&mut self, decay_secs: f32) {
        let room = ((decay_secs - 0.5) / 3.5).clamp(0.0, 1.0);
        let feedback = room * Self::SCALE_ROOM + Self::OFFSET_ROOM;
        let damping = 0.5 * Self::SCALE_DAMPING;
        for comb in &mut self.combs {
            comb.feedback = feedback;
            comb.damping = damping;
        }
    }

    /// Process one sample, returning the wet signal
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let input = input * self.gain;
        let mut out: f32 = self.combs.iter_mut().map(|c| c.process(input)).sum();
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }
}

/// Chorus parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChorusParams {
    /// LFO rate in Hz
    pub frequency: f32,
    /// Center delay in milliseconds
    pub delay_ms: f32,
    /// Modulation depth as a fraction of the delay (0.0..=1.0)
    pub depth: f32,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            frequency: 4.0,
            delay_ms: 2.5,
            depth: 0.5,
        }
    }
}

/// Modulated delay chorus returning the wet signal only
pub struct Chorus {
    params: ChorusParams,
    buffer: Vec<f32>,
    write: usize,
    phase: f32,
    phase_step: f32,
    center: f32,
    swing: f32,
}

impl Chorus {
    pub fn new(params: ChorusParams, sample_rate: f32) -> Self {
        let depth = params.depth.clamp(0.0, 1.0);
        let center = params.delay_ms.max(0.1) * 0.001 * sample_rate;
        let swing = center * depth;
        // Room for the longest modulated delay plus interpolation
        let size = (center + swing) as usize + 4;
        Self {
            params,
            buffer: vec![0.0; size],
            write: 0,
            phase: 0.0,
            phase_step: params.frequency / sample_rate,
            center,
            swing,
        }
    }

    pub fn params(&self) -> ChorusParams {
        self.params
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let len = self.buffer.len();
        self.buffer[self.write] = input;

        let delay = self.center + self.swing * (self.phase * TAU).sin();
        let read = self.write as f32 + len as f32 - delay;
        let base = read.floor();
        let frac = read - base;
        let i0 = base as usize % len;
        let i1 = (i0 + 1) % len;
        let out = self.buffer[i0] * (1.0 - frac) + self.buffer[i1] * frac;

        self.write = (self.write + 1) % len;
        self.phase = (self.phase + self.phase_step).fract();
        out
    }
}
