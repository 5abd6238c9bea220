// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Linear ADSR amplitude envelope.

/// Envelope times in seconds and sustain level in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl EnvelopeParams {
    /// Create parameters, clamping into usable ranges
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.clamp(0.001, 10.0),
            decay: decay.clamp(0.001, 10.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.clamp(0.001, 10.0),
        }
    }
}

impl Default for EnvelopeParams {
    /// Soft pad shape used by the instrument voice
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.3,
            sustain: 0.4,
            release: 1.2,
        }
    }
}

/// Envelope stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-sample ADSR generator
#[derive(Debug, Clone)]
pub struct Envelope {
    params: EnvelopeParams,
    stage: Stage,
    level: f32,
    release_from: f32,
    position: f32,
    attack_samples: f32,
    decay_samples: f32,
    release_samples: f32,
}

impl Envelope {
    pub fn new(params: EnvelopeParams, sample_rate: f32) -> Self {
        Self {
            params,
            stage: Stage::Idle,
            level: 0.0,
            release_from: 0.0,
            position: 0.0,
            attack_samples: params.attack * sample_rate,
            decay_samples: params.decay * sample_rate,
            release_samples: params.release * sample_rate,
        }
    }

    /// Start the attack from the current level
    pub fn trigger(&mut self) {
        self.stage = Stage::Attack;
        // Retriggering a sounding voice ramps up from where it is
        self.position = self.level * self.attack_samples;
    }

    /// Enter release; no effect when idle or already releasing
    pub fn release(&mut self) {
        if matches!(self.stage, Stage::Idle | Stage::Release) {
            return;
        }
        self.stage = Stage::Release;
        self.release_from = self.level;
        self.position = 0.0;
    }

    /// Silence immediately
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
        self.position = 0.0;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == Stage::Release
    }

    /// Advance one sample and return the gain
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                self.position += 1.0;
                self.level = (self.position / self.attack_samples).min(1.0);
                if self.position >= self.attack_samples {
                    self.stage = Stage::Decay;
                    self.position = 0.0;
                    self.level = 1.0;
                }
            }
            Stage::Decay => {
                self.position += 1.0;
                let progress = (self.position / self.decay_samples).min(1.0);
                self.level = 1.0 - (1.0 - self.params.sustain) * progress;
                if self.position >= self.decay_samples {
                    self.stage = Stage::Sustain;
                    self.level = self.params.sustain;
                }
            }
            Stage::Sustain => {
                self.level = self.params.sustain;
            }
            Stage::Release => {
                self.position += 1.0;
                let progress = (self.position / self.release_samples).min(1.0);
                self.level = self.release_from * (1.0 - progress);
                if self.position >= self.release_samples {
                    self.reset();
                }
            }
        }
        self.level
    }
}
