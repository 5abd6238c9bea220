// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Deterministic transport for offline driving and tests.
//!
//! Ticks fire only when [`ManualTransport::fire`] is called. Clones share
//! state, so one handle can be given to a controller while another drives it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::{NoteValue, Tempo, Tick, TickCallback, Transport, TransportError};

#[derive(Default)]
struct ManualState {
    callback: Option<TickCallback>,
    interval: Option<NoteValue>,
    run_id: u64,
    next_index: u64,
    origin: Option<Instant>,
    starts: u64,
    disposes: u64,
}

/// Transport whose ticks are fired by hand
#[derive(Clone)]
pub struct ManualTransport {
    state: Arc<Mutex<ManualState>>,
    tempo: Tempo,
}

impl ManualTransport {
    /// Create a stopped manual transport
    pub fn new(tempo: Tempo) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState::default())),
            tempo,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fire the next tick; returns false when not running
    pub fn fire(&self) -> bool {
        let (mut callback, tick, run_id) = {
            let mut state = self.lock();
            let Some(interval) = state.interval else {
                return false;
            };
            let Some(callback) = state.callback.take() else {
                return false;
            };
            let period = self.tempo.interval(interval);
            let origin = *state.origin.get_or_insert_with(Instant::now);
            let index = state.next_index;
            state.next_index += 1;
            let offset = period.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
            let scheduled = origin.checked_add(offset).unwrap_or(origin);
            (callback, Tick { index, scheduled, interval: period }, state.run_id)
        };

        // Run outside the lock so the callback may inspect this transport
        callback(tick);

        let mut state = self.lock();
        if state.run_id == run_id && state.interval.is_some() {
            state.callback = Some(callback);
        }
        true
    }

    /// Fire up to `count` ticks, returning how many fired
    pub fn fire_n(&self, count: usize) -> usize {
        (0..count).take_while(|_| self.fire()).count()
    }

    /// Number of times the transport was started
    pub fn start_count(&self) -> u64 {
        self.lock().starts
    }

    /// Number of dispose calls that stopped a running transport
    pub fn dispose_count(&self) -> u64 {
        self.lock().disposes
    }

    /// Interval of the current run
    pub fn interval(&self) -> Option<NoteValue> {
        self.lock().interval
    }
}

impl Transport for ManualTransport {
    fn start(&mut self, interval: NoteValue, on_tick: TickCallback) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.interval.is_some() {
            return Err(TransportError::AlreadyRunning);
        }
        state.callback = Some(on_tick);
        state.interval = Some(interval);
        state.run_id += 1;
        state.next_index = 0;
        state.origin = None;
        state.starts += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        let mut state = self.lock();
        if state.interval.take().is_some() {
            state.disposes += 1;
        }
        state.callback = None;
    }

    fn is_running(&self) -> bool {
        self.lock().interval.is_some()
    }

    fn tempo(&self) -> Tempo {
        self.tempo.clone()
    }
}
