// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! Provides low-latency audio output with configurable buffer sizes.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use tracing::{debug, error};

use super::AudioError;

/// Smallest accepted buffer size in frames
pub const MIN_BUFFER_SIZE: u32 = 64;
/// Largest accepted buffer size in frames
pub const MAX_BUFFER_SIZE: u32 = 4096;

/// Audio output configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Buffer size in frames
    pub buffer_size: u32,
    /// Number of output channels
    pub channels: u16,
}

impl AudioConfig {
    /// Create a stereo configuration, clamping the buffer size
    pub fn new(sample_rate: u32, buffer_size: u32) -> Self {
        Self {
            sample_rate,
            buffer_size: buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
            channels: 2,
        }
    }

    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f64 {
        (self.buffer_size as f64 / self.sample_rate as f64) * 1000.0
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
        }
    }
}

/// Audio output stream
///
/// The stream plays until this value is dropped.
pub struct AudioOutput {
    _stream: Stream,
    device_name: String,
    config: AudioConfig,
}

impl AudioOutput {
    /// Open the default output device and start calling `callback`
    ///
    /// The callback receives a zeroed interleaved buffer and the channel count.
    pub fn new<F>(config: AudioConfig, mut callback: F) -> Result<Self, AudioError>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device_label(&device);

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    callback(data, channels);
                },
                move |err| {
                    error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamFailed(format!("failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("failed to start stream: {}", e)))?;

        debug!(
            device = %device_name,
            sample_rate = config.sample_rate,
            latency_ms = config.latency_ms(),
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            device_name,
            config,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Name of the device being played through
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

fn device_label(device: &Device) -> String {
    device.name().unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_config_default() {
        let config = AudioConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.buffer_size, 512);
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn test_buffer_size_clamping() {
        assert_eq!(AudioConfig::new(44100, 32).buffer_size, 64);
        assert_eq!(AudioConfig::new(44100, 10000).buffer_size, 4096);
        assert_eq!(AudioConfig::new(48000, 256).buffer_size, 256);
    }

    #[test]
    fn test_latency_calculation() {
        let config = AudioConfig::new(44100, 512);
        assert!((config.latency_ms() - 11.6).abs() < 0.1);
    }
}
