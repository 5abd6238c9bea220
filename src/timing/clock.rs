// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport clock implementation.
//!
//! The clock runs a dedicated timing thread that invokes a tick callback
//! once per musical interval, the first tick at time zero. Each deadline is
//! the previous deadline plus the interval at the tempo read when that tick
//! fired, so a tempo change applies to ticks not yet fired.

use std::sync::mpsc::{self, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{NoteValue, Tempo, TransportError};

/// One invocation of the transport's tick callback
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    /// Ticks fired since start, from 0
    pub index: u64,
    /// Instant the tick was scheduled for
    pub scheduled: Instant,
    /// Interval to the next tick at the tempo in effect
    pub interval: Duration,
}

/// Tick callback run on the timing context
pub type TickCallback = Box<dyn FnMut(Tick) + Send + 'static>;

/// A periodic scheduler bound to a tempo.
///
/// Only one run may be active per transport. Starting again without
/// disposing first is a programming error reported as
/// [`TransportError::AlreadyRunning`].
pub trait Transport: Send {
    /// Begin invoking `on_tick` once per `interval`, first tick at time zero
    fn start(&mut self, interval: NoteValue, on_tick: TickCallback) -> Result<(), TransportError>;

    /// Stop future ticks and release the callback; idempotent.
    ///
    /// When this returns no further tick callback runs.
    fn dispose(&mut self);

    /// Check if a run is active
    fn is_running(&self) -> bool;

    /// Handle to the tempo driving the tick interval
    fn tempo(&self) -> Tempo;

    /// Change the tempo for ticks not yet fired
    fn set_tempo(&self, bpm: f64) -> Result<(), TransportError> {
        self.tempo().set(bpm)
    }
}

/// A running clock thread
struct ClockRun {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Real-time transport clock backed by a timing thread
pub struct TransportClock {
    tempo: Tempo,
    run: Option<ClockRun>,
}

impl TransportClock {
    /// Create a stopped clock driven by a tempo handle
    pub fn new(tempo: Tempo) -> Self {
        Self { tempo, run: None }
    }

    /// Current tempo in BPM
    pub fn bpm(&self) -> f64 {
        self.tempo.bpm()
    }
}

impl Transport for TransportClock {
    fn start(&mut self, interval: NoteValue, on_tick: TickCallback) -> Result<(), TransportError> {
        if self.is_running() {
            return Err(TransportError::AlreadyRunning);
        }
        // A finished thread from an earlier run is reaped here
        self.dispose();

        let (cancel_tx, cancel_rx) = mpsc::channel();
        let tempo = self.tempo.clone();

        let handle = thread::Builder::new()
            .name("chordflow-transport".to_string())
            .spawn(move || run_clock(tempo, interval, on_tick, cancel_rx))
            .map_err(TransportError::Spawn)?;

        debug!(bpm = self.tempo.bpm(), %interval, "transport started");
        self.run = Some(ClockRun { cancel_tx, handle });
        Ok(())
    }

    fn dispose(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        let _ = run.cancel_tx.send(());
        drop(run.cancel_tx);

        // Disposing from inside a tick must not join its own thread; the
        // loop exits on its own once the callback returns.
        if run.handle.thread().id() == thread::current().id() {
            return;
        }
        if run.handle.join().is_err() {
            warn!("transport thread panicked");
        }
        debug!("transport disposed");
    }

    fn is_running(&self) -> bool {
        self.run
            .as_ref()
            .map(|run| !run.handle.is_finished())
            .unwrap_or(false)
    }

    fn tempo(&self) -> Tempo {
        self.tempo.clone()
    }
}

impl Drop for TransportClock {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Timing thread body
fn run_clock(
    tempo: Tempo,
    interval: NoteValue,
    mut on_tick: TickCallback,
    cancel_rx: mpsc::Receiver<()>,
) {
    let mut index = 0u64;
    let mut deadline = Instant::now();

    loop {
        let now = Instant::now();
        if deadline > now {
            match cancel_rx.recv_timeout(deadline - now) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match cancel_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let period = tempo.interval(interval);
        on_tick(Tick {
            index,
            scheduled: deadline,
            interval: period,
        });
        index += 1;

        let Some(next) = deadline.checked_add(period) else {
            warn!("tick interval overflowed the clock; stopping");
            break;
        };
        // If we fell more than a full period behind, drop the missed ticks
        // rather than firing them back to back.
        let now = Instant::now();
        deadline = if now.saturating_duration_since(next) > period {
            debug!(index, "transport resynchronized after falling behind");
            now
        } else {
            next
        };
    }
}
