// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for chordflow.
//!
//! Provides a ratatui-based terminal interface with the chord slot grid,
//! transport display, a mood prompt and a playable keyboard. The
//! highlighted slot is drained from the playback highlight channel once per
//! frame, and mood suggestions run on the async runtime so drawing never
//! waits on them.

mod slots;
mod transport;

pub use slots::SlotGridWidget;
pub use transport::TransportWidget;

use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::{info, warn};

use crate::chords::{MidiNote, Pitch};
use crate::export::{export_range_with_velocity, SmfWriter, EXPORT_VELOCITY};
use crate::playback::{HighlightReceiver, PlaybackController};
use crate::progression::{LoopMode, ROW_LENGTH};
use crate::suggest::{MoodSuggester, Suggestion};

/// Slowest tempo the UI offers
pub const TEMPO_MIN: f64 = 60.0;
/// Fastest tempo the UI offers
pub const TEMPO_MAX: f64 = 160.0;

const TEMPO_STEP: f64 = 1.0;
const TEMPO_COARSE_STEP: f64 = 10.0;
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Lowest note of the playable keyboard (C4)
pub const KEYBOARD_BASE_NOTE: MidiNote = 60;

/// Keyboard keys in semitone order from [`KEYBOARD_BASE_NOTE`], laid out
/// like a piano on the bottom row with sharps on the row above
const KEYBOARD_KEYS: [char; 13] = ['z', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm', ','];

/// Semitone offset of a keyboard key
fn keyboard_offset(c: char) -> Option<u8> {
    KEYBOARD_KEYS.iter().position(|k| *k == c).map(|i| i as u8)
}

/// Which keys are text, notes or commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a mood
    Mood,
    /// Letter keys play notes
    Keyboard,
}

/// UI-only state
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Slot with the edit cursor
    pub selected: usize,
    /// Slot drawn highlighted this frame
    pub highlighted: Option<usize>,
    /// Help text visible
    pub show_help: bool,
    /// Mood being typed, when the prompt is open
    pub mood_input: Option<String>,
    /// Mood whose suggestion is in flight
    pub composing: Option<String>,
    /// Keyboard mode on
    pub keyboard: bool,
    /// Last pitch played from the keyboard
    pub last_note: Option<String>,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl UiState {
    pub fn input_mode(&self) -> InputMode {
        if self.mood_input.is_some() {
            InputMode::Mood
        } else if self.keyboard {
            InputMode::Keyboard
        } else {
            InputMode::Normal
        }
    }

    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message
    pub fn clear_expired_status(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_time = None;
            }
        }
    }
}

/// Key event result
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    /// No action needed
    None,
    /// Quit the application
    Quit,
    /// Stop all playback
    Stop,
    /// Start a loop, or stop it if already playing
    ToggleLoop(LoopMode),
    /// Audition a slot
    Preview(usize),
    /// Audition the selected slot
    PreviewSelected,
    /// Move the cursor
    SelectPrev,
    SelectNext,
    /// Step the selected slot through the chord list
    NextChord,
    PrevChord,
    /// Change tempo by `f64` BPM
    Tempo(f64),
    /// Write a range to its MIDI file
    Export(LoopMode),
    /// Export the row holding the cursor
    ExportSelectedRow,
    /// Fill every slot with random chords
    Randomize,
    /// Open the mood prompt
    BeginMood,
    /// Mood prompt editing
    InputChar(char),
    InputBackspace,
    SubmitMood,
    CancelMood,
    /// Open or close the playable keyboard
    ToggleKeyboard,
    /// Play the keyboard key this many semitones above C4
    PlayKey(u8),
    /// Toggle help
    ToggleHelp,
}

/// Map a key press to an action
///
/// While the mood prompt is open, printable keys are text. In keyboard
/// mode the piano keys play notes and every other key keeps its command.
pub fn map_key(code: KeyCode, modifiers: KeyModifiers, mode: InputMode) -> KeyAction {
    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => KeyAction::Quit,
            _ => KeyAction::None,
        };
    }

    match mode {
        InputMode::Mood => {
            return match code {
                KeyCode::Enter => KeyAction::SubmitMood,
                KeyCode::Esc => KeyAction::CancelMood,
                KeyCode::Backspace => KeyAction::InputBackspace,
                KeyCode::Char(c) => KeyAction::InputChar(c),
                _ => KeyAction::None,
            };
        }
        InputMode::Keyboard => {
            if let KeyCode::Char(c) = code {
                if let Some(offset) = keyboard_offset(c) {
                    return KeyAction::PlayKey(offset);
                }
            }
            if matches!(code, KeyCode::Esc | KeyCode::Char('k')) {
                return KeyAction::ToggleKeyboard;
            }
        }
        InputMode::Normal => {}
    }

    match code {
        KeyCode::Char('q') => KeyAction::Quit,
        KeyCode::Esc => KeyAction::Stop,

        // Loops
        KeyCode::Char(' ') => KeyAction::ToggleLoop(LoopMode::All),
        KeyCode::Char('a') => KeyAction::ToggleLoop(LoopMode::RowA),
        KeyCode::Char('b') => KeyAction::ToggleLoop(LoopMode::RowB),

        // Slots (1-8)
        KeyCode::Char(c @ '1'..='8') => KeyAction::Preview((c as usize) - ('1' as usize)),
        KeyCode::Enter => KeyAction::PreviewSelected,
        KeyCode::Left => KeyAction::SelectPrev,
        KeyCode::Right => KeyAction::SelectNext,
        KeyCode::Up => KeyAction::NextChord,
        KeyCode::Down => KeyAction::PrevChord,

        // Tempo
        KeyCode::Char('+') | KeyCode::Char('=') => KeyAction::Tempo(TEMPO_STEP),
        KeyCode::Char('-') => KeyAction::Tempo(-TEMPO_STEP),
        KeyCode::Char(']') => KeyAction::Tempo(TEMPO_COARSE_STEP),
        KeyCode::Char('[') => KeyAction::Tempo(-TEMPO_COARSE_STEP),

        // Export
        KeyCode::Char('e') => KeyAction::Export(LoopMode::All),
        KeyCode::Char('E') => KeyAction::ExportSelectedRow,

        KeyCode::Char('r') => KeyAction::Randomize,
        KeyCode::Char('m') => KeyAction::BeginMood,
        KeyCode::Char('k') => KeyAction::ToggleKeyboard,
        KeyCode::Char('?') | KeyCode::Char('h') => KeyAction::ToggleHelp,

        _ => KeyAction::None,
    }
}

/// Where and how exports are written
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub writer: SmfWriter,
    pub velocity: f64,
    pub directory: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            writer: SmfWriter::new(),
            velocity: EXPORT_VELOCITY,
            directory: PathBuf::from("."),
        }
    }
}

/// Everything the UI drives, independent of the terminal
pub struct Workspace {
    controller: PlaybackController,
    highlight: HighlightReceiver,
    suggester: Arc<MoodSuggester>,
    pending: Option<oneshot::Receiver<Suggestion>>,
    runtime: Handle,
    export: ExportSettings,
    ui: UiState,
}

impl Workspace {
    pub fn new(
        mut controller: PlaybackController,
        suggester: MoodSuggester,
        runtime: Handle,
        export: ExportSettings,
    ) -> Self {
        let highlight = controller.subscribe_highlight();
        Self {
            controller,
            highlight,
            suggester: Arc::new(suggester),
            pending: None,
            runtime,
            export,
            ui: UiState::default(),
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Check if a mood suggestion is still being fetched
    pub fn is_composing(&self) -> bool {
        self.pending.is_some()
    }

    /// Per-frame update: apply due highlights and a finished suggestion,
    /// expire the status line
    pub fn frame(&mut self, now: Instant) {
        self.ui.highlighted = self.highlight.poll_frame(now);
        self.poll_suggestion();
        self.ui.clear_expired_status();
    }

    /// Apply an action; returns `false` when the app should exit
    pub fn apply(&mut self, action: KeyAction) -> bool {
        let slots = self.controller.layout().len();
        let result: Result<()> = match action {
            KeyAction::None => Ok(()),
            KeyAction::Quit => {
                self.controller.shutdown();
                return false;
            }
            KeyAction::Stop => {
                self.controller.stop_all();
                Ok(())
            }
            KeyAction::ToggleLoop(mode) => self.controller.start_loop(mode).map_err(Into::into),
            KeyAction::Preview(index) => {
                if index < slots {
                    self.ui.selected = index;
                    self.controller.preview(index).map_err(Into::into)
                } else {
                    Ok(())
                }
            }
            KeyAction::PreviewSelected => self.controller.preview(self.ui.selected).map_err(Into::into),
            KeyAction::SelectPrev => {
                self.ui.selected = (self.ui.selected + slots - 1) % slots;
                Ok(())
            }
            KeyAction::SelectNext => {
                self.ui.selected = (self.ui.selected + 1) % slots;
                Ok(())
            }
            KeyAction::NextChord => self.step_chord(1),
            KeyAction::PrevChord => self.step_chord(-1),
            KeyAction::Tempo(delta) => self.nudge_tempo(delta),
            KeyAction::Export(mode) => self.export(mode),
            KeyAction::ExportSelectedRow => self.export_selected_row(),
            KeyAction::Randomize => self.randomize(),
            KeyAction::BeginMood => {
                self.ui.mood_input = Some(String::new());
                Ok(())
            }
            KeyAction::InputChar(c) => {
                if let Some(input) = self.ui.mood_input.as_mut() {
                    input.push(c);
                }
                Ok(())
            }
            KeyAction::InputBackspace => {
                if let Some(input) = self.ui.mood_input.as_mut() {
                    input.pop();
                }
                Ok(())
            }
            KeyAction::SubmitMood => self.submit_mood(),
            KeyAction::CancelMood => {
                self.ui.mood_input = None;
                Ok(())
            }
            KeyAction::ToggleKeyboard => {
                self.ui.keyboard = !self.ui.keyboard;
                Ok(())
            }
            KeyAction::PlayKey(offset) => self.play_key(offset),
            KeyAction::ToggleHelp => {
                self.ui.show_help = !self.ui.show_help;
                Ok(())
            }
        };

        self.report(result);
        true
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(err) = result {
            warn!("{:#}", err);
            self.ui.set_status(format!("{:#}", err));
        }
    }

    fn step_chord(&mut self, step: isize) -> Result<()> {
        let index = self.ui.selected;
        let labels = self.controller.dictionary().available_chords();
        if labels.is_empty() {
            return Ok(());
        }
        let progression = self.controller.progression();
        let current = progression.get(index).unwrap_or_default();
        let next = match labels.iter().position(|l| l == current) {
            Some(pos) => (pos as isize + step).rem_euclid(labels.len() as isize) as usize,
            None => 0,
        };
        self.controller.set_chord(index, &labels[next])?;
        Ok(())
    }

    fn nudge_tempo(&mut self, delta: f64) -> Result<()> {
        let bpm = (self.controller.tempo() + delta).clamp(TEMPO_MIN, TEMPO_MAX);
        self.controller.set_tempo(bpm)?;
        Ok(())
    }

    fn randomize(&mut self) -> Result<()> {
        let len = self.controller.layout().len();
        let labels = self
            .controller
            .dictionary()
            .random_labels(len, &mut rand::thread_rng());
        self.controller.set_progression(labels)?;
        self.ui.set_status("Randomized progression");
        Ok(())
    }

    fn play_key(&mut self, offset: u8) -> Result<()> {
        let pitch = Pitch::from_midi(KEYBOARD_BASE_NOTE.saturating_add(offset)).to_string();
        self.controller.play_note(&pitch)?;
        self.ui.last_note = Some(pitch);
        Ok(())
    }

    /// Start fetching a suggestion; an empty mood leaves everything as is
    fn submit_mood(&mut self) -> Result<()> {
        let Some(mood) = self.ui.mood_input.as_deref().map(str::trim) else {
            return Ok(());
        };
        if mood.is_empty() {
            return Ok(());
        }
        let mood = mood.to_string();
        self.ui.mood_input = None;
        if self.pending.is_some() {
            self.ui.set_status("Still composing, try again shortly");
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        let suggester = Arc::clone(&self.suggester);
        let task_mood = mood.clone();
        self.runtime.spawn(async move {
            let suggestion = suggester.suggest(&task_mood).await;
            let _ = tx.send(suggestion);
        });
        self.pending = Some(rx);
        self.ui.composing = Some(mood);
        Ok(())
    }

    /// Apply a finished suggestion, if one has arrived
    fn poll_suggestion(&mut self) {
        let Some(rx) = self.pending.as_mut() else {
            return;
        };
        let received = match rx.try_recv() {
            Err(TryRecvError::Empty) => return,
            Ok(suggestion) => Some(suggestion),
            Err(TryRecvError::Closed) => None,
        };
        self.pending = None;
        let mood = self.ui.composing.take().unwrap_or_default();

        let result = match received {
            Some(suggestion) => self.apply_suggestion(&mood, &suggestion),
            None => Err(anyhow!("Suggestion for \"{}\" was abandoned", mood)),
        };
        self.report(result);
    }

    fn apply_suggestion(&mut self, mood: &str, suggestion: &Suggestion) -> Result<()> {
        let labels = suggestion.labels_for(self.controller.layout().len());
        self.controller.set_progression(labels)?;
        match suggestion.message() {
            Some(message) => self.ui.set_status(message.to_string()),
            None => self.ui.set_status(format!("Progression for \"{}\"", mood)),
        }
        Ok(())
    }

    /// Export the row holding the cursor
    fn export_selected_row(&mut self) -> Result<()> {
        let row_a = self.controller.layout().range_for(LoopMode::RowA)?;
        let mode = if row_a.contains(self.ui.selected) {
            LoopMode::RowA
        } else {
            LoopMode::RowB
        };
        self.export(mode)
    }

    /// Write a range of the progression to its export file
    pub fn export(&mut self, mode: LoopMode) -> Result<()> {
        let path = export_mode(&self.controller, mode, &self.export)?;
        self.ui.set_status(format!("Exported {}", path.display()));
        Ok(())
    }
}

/// Export the slots a loop mode covers to `<directory>/<mode filename>`
pub fn export_mode(
    controller: &PlaybackController,
    mode: LoopMode,
    settings: &ExportSettings,
) -> Result<PathBuf> {
    let progression = controller.progression();
    let range = progression.layout().range_for(mode)?;
    let timeline = export_range_with_velocity(
        &progression,
        controller.dictionary(),
        range.start,
        range.len,
        controller.tempo(),
        settings.velocity,
    )?;
    let path = settings.directory.join(mode.export_filename());
    settings
        .writer
        .write_file(&timeline, &path)
        .with_context(|| format!("Failed to export {}", path.display()))?;
    info!(%mode, path = %path.display(), "exported");
    Ok(path)
}

/// Terminal UI application
pub struct App {
    /// Terminal handle
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Target frame rate
    frame_rate: u32,
    /// Whether to continue running
    running: bool,
}

impl App {
    /// Take over the terminal
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            frame_rate: 60,
            running: true,
        })
    }

    /// Set frame rate
    pub fn set_frame_rate(&mut self, fps: u32) {
        self.frame_rate = fps.clamp(1, 120);
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run until the user quits
    pub fn run(&mut self, workspace: &mut Workspace) -> io::Result<()> {
        while self.running {
            workspace.frame(Instant::now());
            self.draw(workspace)?;

            if let Some(Event::Key(key)) = self.poll_event()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let action = map_key(key.code, key.modifiers, workspace.ui().input_mode());
                self.running = workspace.apply(action);
            }
        }
        Ok(())
    }

    /// Poll for events with timeout
    fn poll_event(&self) -> io::Result<Option<Event>> {
        let timeout = Duration::from_millis(1000 / self.frame_rate as u64);
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }

    /// Draw the UI
    fn draw(&mut self, workspace: &Workspace) -> io::Result<()> {
        let controller = workspace.controller();
        let progression = controller.progression();
        let state = controller.state();
        let tempo = controller.tempo();
        let step = controller.step_counter();
        let ui = workspace.ui();
        let rows = (progression.len() / ROW_LENGTH) as u16;

        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),            // Transport
                    Constraint::Length(rows * 5 + 2), // Slots
                    Constraint::Min(0),               // Padding
                    Constraint::Length(1),            // Prompt / status bar
                ])
                .split(area);

            frame.render_widget(
                TransportWidget::new(state, tempo, step)
                    .block(Block::default().borders(Borders::ALL).title(" Transport ")),
                chunks[0],
            );

            frame.render_widget(
                SlotGridWidget::new(&progression, controller.dictionary())
                    .selected(ui.selected)
                    .highlighted(ui.highlighted)
                    .block(Block::default().borders(Borders::ALL).title(" Progression ")),
                chunks[1],
            );

            render_status_bar(frame, chunks[3], ui);

            if ui.show_help {
                render_help_overlay(frame, area);
            }
        })?;

        Ok(())
    }

    /// Restore the terminal
    fn cleanup(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Render the prompt or status bar
fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let line = if let Some(input) = &state.mood_input {
        Line::from(vec![Span::styled(" Mood: ", label), Span::raw(format!("{}_", input))])
    } else if let Some(mood) = &state.composing {
        Line::from(Span::styled(
            format!(" Composing for \"{}\"...", mood),
            Style::default().fg(Color::Yellow),
        ))
    } else if state.keyboard {
        Line::from(vec![
            Span::styled(" Keys: ", label),
            Span::raw("z s x d c v g b h n j m , (C4-C5) | k/Esc: Close "),
            Span::styled(
                state.last_note.clone().unwrap_or_default(),
                Style::default().fg(Color::Green),
            ),
        ])
    } else if let Some(ref msg) = state.status_message {
        Line::from(Span::styled(msg.as_str(), Style::default().fg(Color::Yellow)))
    } else {
        Line::from(Span::styled(
            " Space: Loop all | a/b: Loop row | 1-8: Preview | Esc: Stop | m: Mood | k: Keys | h: Help | q: Quit",
            Style::default().fg(Color::DarkGray),
        ))
    };

    frame.render_widget(Paragraph::new(line), area);
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width.saturating_sub(4));
    let height = 24.min(area.height.saturating_sub(4));
    let x = (area.width - width) / 2;
    let y = (area.height - height) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(help_area);
    frame.render_widget(block, help_area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let help_text = vec![
        Line::from(Span::styled("Playback", bold)),
        Line::from("  Space       Loop all slots"),
        Line::from("  a / b       Loop row 1 / row 2"),
        Line::from("  1-8         Preview slot"),
        Line::from("  Esc         Stop"),
        Line::from("  +/- [/]     Tempo +/- 1 / 10 BPM"),
        Line::from(""),
        Line::from(Span::styled("Editing", bold)),
        Line::from("  Left/Right  Select slot"),
        Line::from("  Up/Down     Change chord"),
        Line::from("  Enter       Preview selected"),
        Line::from("  r           Random chords"),
        Line::from("  m           Chords from a mood"),
        Line::from(""),
        Line::from(Span::styled("Keyboard (k)", bold)),
        Line::from("  z s x ... , Play C4 up to C5"),
        Line::from(""),
        Line::from(Span::styled("Other", bold)),
        Line::from("  e / E       Export all / selected row"),
        Line::from("  h/?         Toggle help"),
        Line::from("  q/Ctrl+c    Quit"),
    ];

    frame.render_widget(Paragraph::new(help_text), inner);
}

/// Default export directory for a session: the working directory
pub fn default_export_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
}
