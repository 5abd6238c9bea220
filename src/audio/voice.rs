// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Instrument voice backed by the polyphonic synth and a cpal stream.
//!
//! The synth and the output stream are created on first use. The cpal
//! stream is not `Send`, so it lives on its own thread, which keeps it
//! open until the voice is dropped.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::output::{AudioConfig, AudioOutput};
use super::synth::{PolySynth, SynthParams};
use super::{AudioError, Voice};
use crate::chords::{NoteSet, Pitch};

/// Running synth plus the thread holding its output stream
struct Engine {
    synth: Arc<Mutex<PolySynth>>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

enum EngineSlot {
    Cold,
    Running(Engine),
    Failed(AudioError),
}

/// Synthesized instrument voice with lazy, once-only initialization
pub struct InstrumentVoice {
    config: AudioConfig,
    params: SynthParams,
    engine: Mutex<EngineSlot>,
}

impl InstrumentVoice {
    pub fn new(config: AudioConfig, params: SynthParams) -> Self {
        Self {
            config,
            params,
            engine: Mutex::new(EngineSlot::Cold),
        }
    }

    #[cfg(test)]
    fn is_initialized(&self) -> bool {
        matches!(*self.lock_engine(), EngineSlot::Running(_))
    }

    fn lock_engine(&self) -> MutexGuard<'_, EngineSlot> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The synth, starting the audio graph on first call
    ///
    /// A failed start is remembered and returned on every later call.
    fn synth(&self) -> Result<Arc<Mutex<PolySynth>>, AudioError> {
        let mut slot = self.lock_engine();
        match &*slot {
            EngineSlot::Running(engine) => return Ok(Arc::clone(&engine.synth)),
            EngineSlot::Failed(err) => return Err(err.clone()),
            EngineSlot::Cold => {}
        }

        match start_engine(self.config.clone(), self.params) {
            Ok(engine) => {
                let synth = Arc::clone(&engine.synth);
                *slot = EngineSlot::Running(engine);
                Ok(synth)
            }
            Err(err) => {
                warn!("audio init failed: {}", err);
                *slot = EngineSlot::Failed(err.clone());
                Err(err)
            }
        }
    }
}

impl Default for InstrumentVoice {
    fn default() -> Self {
        Self::new(AudioConfig::default(), SynthParams::default())
    }
}

impl Voice for InstrumentVoice {
    fn sound_chord(&self, notes: &NoteSet, duration: Duration) -> Result<(), AudioError> {
        if notes.is_empty() {
            return Ok(());
        }
        let synth = self.synth()?;
        let mut synth = synth.lock().unwrap_or_else(PoisonError::into_inner);
        for pitch in notes.pitches() {
            synth.note_on(pitch.midi(), pitch.frequency(), duration);
        }
        Ok(())
    }

    fn sound_note(&self, pitch: &str, duration: Duration) -> Result<(), AudioError> {
        let pitch: Pitch = pitch
            .parse()
            .map_err(|_| AudioError::InvalidPitch(pitch.to_string()))?;
        let synth = self.synth()?;
        let mut synth = synth.lock().unwrap_or_else(PoisonError::into_inner);
        synth.note_on(pitch.midi(), pitch.frequency(), duration);
        Ok(())
    }

    fn release_all(&self) {
        // Nothing can be sounding before the first note
        if let EngineSlot::Running(engine) = &*self.lock_engine() {
            engine
                .synth
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .release_all();
        }
    }
}

impl Drop for InstrumentVoice {
    fn drop(&mut self) {
        let slot = std::mem::replace(&mut *self.lock_engine(), EngineSlot::Cold);
        if let EngineSlot::Running(mut engine) = slot {
            let _ = engine.stop_tx.send(());
            if let Some(handle) = engine.handle.take() {
                if handle.join().is_err() {
                    warn!("audio thread panicked");
                }
            }
            debug!("audio output closed");
        }
    }
}

/// Build the synth and open the stream on a dedicated thread
fn start_engine(config: AudioConfig, params: SynthParams) -> Result<Engine, AudioError> {
    let synth = Arc::new(Mutex::new(PolySynth::with_params(
        params,
        config.sample_rate as f32,
    )));
    let (ready_tx, ready_rx) = mpsc::channel::<Result<String, AudioError>>();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let render_synth = Arc::clone(&synth);

    let handle = thread::Builder::new()
        .name("chordflow-audio".to_string())
        .spawn(move || run_output(config, render_synth, ready_tx, stop_rx))
        .map_err(|e| AudioError::InitFailed(format!("failed to spawn audio thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(device)) => {
            info!(device = %device, "audio initialized");
            Ok(Engine {
                synth,
                stop_tx,
                handle: Some(handle),
            })
        }
        Ok(Err(err)) => {
            let _ = handle.join();
            Err(err)
        }
        Err(_) => {
            let _ = handle.join();
            Err(AudioError::InitFailed("audio thread exited during startup".to_string()))
        }
    }
}

/// Audio thread body: own the stream until told to stop
fn run_output(
    config: AudioConfig,
    synth: Arc<Mutex<PolySynth>>,
    ready_tx: Sender<Result<String, AudioError>>,
    stop_rx: Receiver<()>,
) {
    let output = AudioOutput::new(config, move |buffer, channels| {
        // Skip a buffer rather than block the audio callback
        if let Ok(mut synth) = synth.try_lock() {
            synth.render(buffer, channels);
        }
    });

    match output {
        Ok(output) => {
            let _ = ready_tx.send(Ok(output.device_name().to_string()));
            // Either a stop message or a dropped sender ends playback
            let _ = stop_rx.recv();
            drop(output);
        }
        Err(err) => {
            let _ = ready_tx.send(Err(err));
        }
    }
}
