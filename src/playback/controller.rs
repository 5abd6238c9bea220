// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback state machine.
//!
//! The controller owns the progression, the playback session and the
//! highlight publisher. Ticks from the transport and user operations both
//! mutate this state under one lock; each tick first checks that the
//! session generation it was armed for is still current, so a tick racing
//! a stop or mode switch does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::highlight::{self, HighlightReceiver, HighlightSender};
use super::PlaybackError;
use crate::audio::Voice;
use crate::chords::ChordDictionary;
use crate::progression::{LoopMode, Progression, ProgressionError, SlotLayout, SlotRange};
use crate::timing::{DeferredTimer, NoteValue, Tick, Transport};

/// What the controller is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// One-shot audition of a slot
    Preview { index: usize },
    /// Repeating a slot range on the transport
    Looping { mode: LoopMode, range: SlotRange },
}

impl PlaybackState {
    pub fn is_looping(&self) -> bool {
        matches!(self, PlaybackState::Looping { .. })
    }

    /// Active loop mode, if any
    pub fn loop_mode(&self) -> Option<LoopMode> {
        match self {
            PlaybackState::Looping { mode, .. } => Some(*mode),
            _ => None,
        }
    }
}

/// Note lengths and timings used by the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// How long a previewed chord sounds
    pub preview_length: NoteValue,
    /// How long the preview highlight stays on
    pub preview_highlight: Duration,
    /// How long a freshly edited chord sounds
    pub edit_preview_length: NoteValue,
    /// How long an announced progression's first chord sounds
    pub announce_length: NoteValue,
    /// Interval between loop steps
    pub loop_interval: NoteValue,
    /// How long an interactive key press sounds
    pub key_length: NoteValue,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            preview_length: NoteValue::Quarter,
            preview_highlight: Duration::from_millis(500),
            edit_preview_length: NoteValue::Eighth,
            announce_length: NoteValue::Half,
            loop_interval: NoteValue::Quarter,
            key_length: NoteValue::Eighth,
        }
    }
}

/// Live state of one loop run
#[derive(Debug, Clone, Copy)]
struct Session {
    range: SlotRange,
    counter: u64,
}

/// State shared with tick and timer callbacks
struct Shared {
    state: PlaybackState,
    session: Option<Session>,
    progression: Progression,
    highlighted: Option<usize>,
    generation: u64,
    preview_token: u64,
    highlight_tx: HighlightSender,
}

impl Shared {
    /// Return to idle and clear the highlight
    fn enter_idle(&mut self) {
        self.state = PlaybackState::Idle;
        self.session = None;
        if self.highlighted.take().is_some() {
            self.highlight_tx.publish(None, Instant::now());
        }
    }

    fn set_highlight(&mut self, slot: usize, at: Instant) {
        self.highlighted = Some(slot);
        self.highlight_tx.publish(Some(slot), at);
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Chord progression playback controller
pub struct PlaybackController {
    shared: Arc<Mutex<Shared>>,
    voice: Arc<dyn Voice>,
    dictionary: Arc<ChordDictionary>,
    transport: Box<dyn Transport>,
    preview_timer: Option<DeferredTimer>,
    options: PlaybackOptions,
}

impl PlaybackController {
    /// Create an idle controller
    pub fn new(
        voice: Arc<dyn Voice>,
        transport: Box<dyn Transport>,
        dictionary: Arc<ChordDictionary>,
        progression: Progression,
    ) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: PlaybackState::Idle,
                session: None,
                progression,
                highlighted: None,
                generation: 0,
                preview_token: 0,
                highlight_tx: HighlightSender::disconnected(),
            })),
            voice,
            dictionary,
            transport,
            preview_timer: None,
            options: PlaybackOptions::default(),
        }
    }

    /// Replace the default note lengths and timings
    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        lock(&self.shared).state
    }

    /// Slot currently highlighted
    pub fn highlighted(&self) -> Option<usize> {
        lock(&self.shared).highlighted
    }

    /// Ticks handled by the current loop run; 0 when not looping
    pub fn step_counter(&self) -> u64 {
        lock(&self.shared).session.map(|s| s.counter).unwrap_or(0)
    }

    /// Snapshot of the progression
    pub fn progression(&self) -> Progression {
        lock(&self.shared).progression.clone()
    }

    pub fn layout(&self) -> SlotLayout {
        lock(&self.shared).progression.layout()
    }

    pub fn dictionary(&self) -> &ChordDictionary {
        &self.dictionary
    }

    /// Tempo in BPM
    pub fn tempo(&self) -> f64 {
        self.transport.tempo().bpm()
    }

    /// Change the tempo; a running loop picks it up on its next tick
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), PlaybackError> {
        self.transport.set_tempo(bpm)?;
        debug!(bpm, "tempo changed");
        Ok(())
    }

    /// Connect a highlight consumer, replacing any earlier one
    pub fn subscribe_highlight(&mut self) -> HighlightReceiver {
        let (tx, rx) = highlight::channel();
        let mut shared = lock(&self.shared);
        if let Some(slot) = shared.highlighted {
            tx.publish(Some(slot), Instant::now());
        }
        shared.highlight_tx = tx;
        rx
    }

    fn check_slot(&self, index: usize) -> Result<(), ProgressionError> {
        let len = lock(&self.shared).progression.len();
        if index < len {
            Ok(())
        } else {
            Err(ProgressionError::SlotOutOfRange { index, len })
        }
    }

    fn duration_of(&self, value: NoteValue) -> Duration {
        self.transport.tempo().interval(value)
    }

    fn cancel_preview(&mut self) {
        if let Some(mut timer) = self.preview_timer.take() {
            timer.cancel();
        }
    }

    /// Stop everything and return to idle
    ///
    /// When this returns the transport is disposed, every voice is
    /// releasing, the highlight is cleared and the counter is reset. Calling
    /// it again has no further effect.
    pub fn stop_all(&mut self) {
        let was = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.preview_token += 1;
            let was = shared.state;
            shared.enter_idle();
            was
        };
        self.transport.dispose();
        self.voice.release_all();
        self.cancel_preview();
        if was != PlaybackState::Idle {
            info!(from = ?was, "playback stopped");
        }
    }

    /// Audition one slot
    ///
    /// A running loop is stopped first. The slot stays highlighted for the
    /// preview highlight time unless another action intervenes.
    pub fn preview(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.check_slot(index)?;
        if self.state().is_looping() {
            self.stop_all();
        } else {
            self.voice.release_all();
            self.cancel_preview();
        }

        let (notes, token) = {
            let mut shared = lock(&self.shared);
            shared.preview_token += 1;
            let label = shared.progression.get(index).unwrap_or_default();
            (self.dictionary.resolve(label), shared.preview_token)
        };

        if let Err(err) = self
            .voice
            .sound_chord(&notes, self.duration_of(self.options.preview_length))
        {
            lock(&self.shared).enter_idle();
            return Err(err.into());
        }

        {
            let mut shared = lock(&self.shared);
            shared.state = PlaybackState::Preview { index };
            shared.set_highlight(index, Instant::now());
        }

        let shared = Arc::clone(&self.shared);
        let timer = DeferredTimer::schedule(self.options.preview_highlight, move || {
            let mut shared = lock(&shared);
            if shared.preview_token == token && shared.state == (PlaybackState::Preview { index }) {
                shared.enter_idle();
            }
        })?;
        self.preview_timer = Some(timer);
        debug!(index, "preview");
        Ok(())
    }

    /// Loop a slot range, or stop if that loop is already playing
    pub fn start_loop(&mut self, mode: LoopMode) -> Result<(), PlaybackError> {
        let range = self.layout().range_for(mode)?;

        if self.state().loop_mode() == Some(mode) {
            self.stop_all();
            return Ok(());
        }

        // Any other mode is torn down completely before the new one starts
        self.stop_all();

        // Audio must be live before the first tick is armed
        self.voice.unlock()?;

        let generation = {
            let mut shared = lock(&self.shared);
            shared.session = Some(Session { range, counter: 0 });
            shared.state = PlaybackState::Looping { mode, range };
            shared.generation
        };

        let on_tick = {
            let shared = Arc::clone(&self.shared);
            let voice = Arc::clone(&self.voice);
            let dictionary = Arc::clone(&self.dictionary);
            move |tick: Tick| {
                let mut guard = lock(&shared);
                let shared = &mut *guard;
                if shared.generation != generation {
                    return;
                }
                let Some(session) = shared.session.as_mut() else {
                    return;
                };
                let active = session.range.slot_for_step(session.counter);
                session.counter += 1;

                // Read at tick time so edits land on the next pass
                let label = shared.progression.get(active).unwrap_or_default();
                let notes = dictionary.resolve(label);
                if let Err(err) = voice.sound_chord(&notes, tick.interval) {
                    warn!(slot = active, "failed to sound chord: {}", err);
                }
                shared.set_highlight(active, tick.scheduled);
                trace!(tick = tick.index, slot = active, "loop step");
            }
        };

        if let Err(err) = self
            .transport
            .start(self.options.loop_interval, Box::new(on_tick))
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.enter_idle();
            return Err(err.into());
        }

        info!(%mode, start = range.start, len = range.len, bpm = self.tempo(), "loop started");
        Ok(())
    }

    /// Replace the chord in one slot and let it be heard
    ///
    /// A running loop keeps going and plays the new chord on its next pass.
    pub fn set_chord(&mut self, index: usize, label: &str) -> Result<(), PlaybackError> {
        self.check_slot(index)?;
        self.voice.release_all();
        lock(&self.shared).progression.set(index, label)?;
        debug!(index, label, "slot edited");

        let notes = self.dictionary.resolve(label);
        self.voice
            .sound_chord(&notes, self.duration_of(self.options.edit_preview_length))?;
        Ok(())
    }

    /// Replace every slot, stopping playback and sounding the first chord
    pub fn set_progression<I, S>(&mut self, labels: I) -> Result<(), PlaybackError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        {
            // Validate before stopping anything
            let shared = lock(&self.shared);
            Progression::from_labels(shared.progression.layout(), labels.iter().cloned())?;
        }
        self.stop_all();

        let first = {
            let mut shared = lock(&self.shared);
            shared.progression.replace_all(labels)?;
            shared.progression.get(0).unwrap_or_default().to_string()
        };
        info!(first = %first, "progression replaced");

        let notes = self.dictionary.resolve(&first);
        self.voice
            .sound_chord(&notes, self.duration_of(self.options.announce_length))?;
        Ok(())
    }

    /// Sound a single pitch, as from an on-screen key
    pub fn play_note(&mut self, pitch: &str) -> Result<(), PlaybackError> {
        self.voice
            .sound_note(pitch, self.duration_of(self.options.key_length))?;
        Ok(())
    }

    /// Stop playback for good
    pub fn shutdown(&mut self) {
        self.stop_all();
        debug!("playback controller shut down");
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioError;
    use crate::chords::NoteSet;
    use crate::timing::{ManualTransport, Tempo};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Chord(Vec<String>, Duration),
        Note(String),
        ReleaseAll,
    }

    #[derive(Default)]
    struct RecordingVoice {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingVoice {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn chords(&self) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Call::Chord(notes, _) => Some(notes),
                    _ => None,
                })
                .collect()
        }
    }

    impl Voice for RecordingVoice {
        fn sound_chord(&self, notes: &NoteSet, duration: Duration) -> Result<(), AudioError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Chord(notes.notes().to_vec(), duration));
            Ok(())
        }

        fn sound_note(&self, pitch: &str, _duration: Duration) -> Result<(), AudioError> {
            self.calls.lock().unwrap().push(Call::Note(pitch.to_string()));
            Ok(())
        }

        fn release_all(&self) {
            self.calls.lock().unwrap().push(Call::ReleaseAll);
        }
    }

    fn setup(layout: SlotLayout) -> (PlaybackController, Arc<RecordingVoice>, ManualTransport) {
        let voice = Arc::new(RecordingVoice::default());
        let transport = ManualTransport::new(Tempo::new(120.0).unwrap());
        let controller = PlaybackController::new(
            voice.clone(),
            Box::new(transport.clone()),
            Arc::new(ChordDictionary::builtin()),
            Progression::default_for(layout),
        );
        (controller, voice, transport)
    }

    fn c_major() -> Vec<String> {
        vec!["C4".to_string(), "E4".to_string(), "G4".to_string()]
    }

    #[test]
    fn test_starts_idle() {
        let (controller, _, _) = setup(SlotLayout::Eight);
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.highlighted(), None);
        assert_eq!(controller.step_counter(), 0);
    }

    #[test]
    fn test_loop_ticks_walk_the_range() {
        let (mut controller, voice, transport) = setup(SlotLayout::Eight);
        controller.start_loop(LoopMode::RowB).unwrap();

        // Wake note before the first tick
        assert!(voice.calls().contains(&Call::Note("C0".to_string())));

        transport.fire();
        assert_eq!(controller.highlighted(), Some(4));
        transport.fire_n(4);
        assert_eq!(controller.highlighted(), Some(4));
        assert_eq!(controller.step_counter(), 5);

        // E Min, A Min, D Min, G 7, then E Min again
        let chords = voice.chords();
        assert_eq!(chords.len(), 5);
        assert_eq!(chords[0], chords[4]);
    }

    #[test]
    fn test_tick_sounds_for_one_interval() {
        let (mut controller, voice, transport) = setup(SlotLayout::Eight);
        controller.start_loop(LoopMode::All).unwrap();
        transport.fire();
        assert_eq!(
            voice.calls().last(),
            Some(&Call::Chord(c_major(), Duration::from_millis(500)))
        );
    }

    #[test]
    fn test_same_mode_toggles_off() {
        let (mut controller, _, transport) = setup(SlotLayout::Eight);
        controller.start_loop(LoopMode::RowA).unwrap();
        transport.fire();
        controller.start_loop(LoopMode::RowA).unwrap();

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.highlighted(), None);
        assert!(!transport.is_running());
    }

    #[test]
    fn test_four_slot_layout_only_loops_all() {
        let (mut controller, _, _) = setup(SlotLayout::Four);
        let err = controller.start_loop(LoopMode::RowA).unwrap_err();
        assert!(matches!(
            err,
            PlaybackError::Progression(ProgressionError::ModeUnavailable(LoopMode::RowA))
        ));
        controller.start_loop(LoopMode::All).unwrap();
        assert_eq!(controller.state().loop_mode(), Some(LoopMode::All));
    }

    #[test]
    fn test_stop_resets_session() {
        let (mut controller, voice, transport) = setup(SlotLayout::Eight);
        controller.start_loop(LoopMode::All).unwrap();
        transport.fire_n(3);
        controller.stop_all();

        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.step_counter(), 0);
        assert_eq!(controller.highlighted(), None);
        assert_eq!(voice.calls().last(), Some(&Call::ReleaseAll));
        assert!(!transport.fire());
    }

    #[test]
    fn test_preview_highlights_then_clears() {
        let (mut controller, voice, _) = setup(SlotLayout::Eight);
        let options = PlaybackOptions {
            preview_highlight: Duration::from_millis(30),
            ..PlaybackOptions::default()
        };
        controller = controller.with_options(options);

        controller.preview(2).unwrap();
        assert_eq!(controller.state(), PlaybackState::Preview { index: 2 });
        assert_eq!(controller.highlighted(), Some(2));
        assert_eq!(voice.calls()[0], Call::ReleaseAll);

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.highlighted(), None);
    }

    #[test]
    fn test_second_preview_replaces_first_timer() {
        let (mut controller, _, _) = setup(SlotLayout::Eight);
        controller = controller.with_options(PlaybackOptions {
            preview_highlight: Duration::from_millis(80),
            ..PlaybackOptions::default()
        });

        controller.preview(0).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        controller.preview(1).unwrap();

        // The first timer would have fired here
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(controller.state(), PlaybackState::Preview { index: 1 });

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_preview_while_looping_stops_loop() {
        let (mut controller, _, transport) = setup(SlotLayout::Eight);
        controller.start_loop(LoopMode::All).unwrap();
        transport.fire_n(2);

        controller.preview(5).unwrap();
        assert_eq!(controller.state(), PlaybackState::Preview { index: 5 });
        assert!(!transport.is_running());
    }

    #[test]
    fn test_preview_out_of_range() {
        let (mut controller, voice, _) = setup(SlotLayout::Four);
        assert!(controller.preview(4).is_err());
        assert!(voice.calls().is_empty());
    }

    #[test]
    fn test_edit_while_looping_applies_next_pass() {
        let (mut controller, voice, transport) = setup(SlotLayout::Four);
        controller.start_loop(LoopMode::All).unwrap();
        transport.fire_n(2);

        controller.set_chord(0, "B Dim").unwrap();
        assert_eq!(controller.step_counter(), 2);
        assert!(controller.state().is_looping());

        transport.fire_n(3);
        let chords = voice.chords();
        let b_dim = vec!["B4".to_string(), "D5".to_string(), "F5".to_string()];
        assert_eq!(chords.last(), Some(&b_dim));
    }

    #[test]
    fn test_set_chord_sounds_eighth_note() {
        let (mut controller, voice, _) = setup(SlotLayout::Eight);
        controller.set_chord(3, "C Maj").unwrap();

        let calls = voice.calls();
        assert_eq!(calls[0], Call::ReleaseAll);
        assert_eq!(calls[1], Call::Chord(c_major(), Duration::from_millis(250)));
        assert_eq!(controller.progression().get(3), Some("C Maj"));
    }

    #[test]
    fn test_set_progression_checks_length() {
        let (mut controller, _, _) = setup(SlotLayout::Four);
        assert!(controller.set_progression(["C Maj"]).is_err());

        controller
            .set_progression(["D Min", "G 7", "C Maj", "C Maj"])
            .unwrap();
        assert_eq!(controller.progression().get(1), Some("G 7"));
    }

    #[test]
    fn test_set_tempo_validates() {
        let (mut controller, _, _) = setup(SlotLayout::Eight);
        controller.set_tempo(140.0).unwrap();
        assert_eq!(controller.tempo(), 140.0);
        assert!(controller.set_tempo(0.0).is_err());
        assert!(controller.set_tempo(f64::NAN).is_err());
        assert_eq!(controller.tempo(), 140.0);
    }

    #[test]
    fn test_highlight_channel_follows_ticks() {
        let (mut controller, _, transport) = setup(SlotLayout::Eight);
        let mut rx = controller.subscribe_highlight();
        controller.start_loop(LoopMode::RowA).unwrap();
        transport.fire_n(2);

        let later = Instant::now() + Duration::from_secs(10);
        assert_eq!(rx.poll_frame(later), Some(1));

        controller.stop_all();
        assert_eq!(rx.poll_frame(later), None);
    }
}
