// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport display widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

use crate::playback::PlaybackState;

use super::{TEMPO_MAX, TEMPO_MIN};

/// Transport widget showing the playback mode and tempo
pub struct TransportWidget<'a> {
    state: PlaybackState,
    tempo: f64,
    step: u64,
    block: Option<Block<'a>>,
}

impl<'a> TransportWidget<'a> {
    /// Create a new transport widget
    pub fn new(state: PlaybackState, tempo: f64, step: u64) -> Self {
        Self {
            state,
            tempo,
            step,
            block: None,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// Indicator text and style for a playback state
pub(crate) fn mode_indicator(state: PlaybackState) -> (String, Style) {
    match state {
        PlaybackState::Idle => ("■ STOP".to_string(), Style::default().fg(Color::Yellow)),
        PlaybackState::Preview { index } => (
            format!("♪ SLOT {}", index + 1),
            Style::default().fg(Color::Cyan),
        ),
        PlaybackState::Looping { mode, .. } => (
            format!("▶ LOOP {}", mode.to_string().to_uppercase()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    }
}

/// Tempo slider as a bar of `width` cells
pub(crate) fn tempo_bar(tempo: f64, width: usize) -> String {
    let span = TEMPO_MAX - TEMPO_MIN;
    let fraction = ((tempo - TEMPO_MIN) / span).clamp(0.0, 1.0);
    let filled = (fraction * width as f64).round() as usize;
    "█".repeat(filled) + &"░".repeat(width - filled)
}

impl Widget for TransportWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(16), // Mode indicator
                Constraint::Length(2),  // Spacer
                Constraint::Length(10), // Step
                Constraint::Length(2),  // Spacer
                Constraint::Length(12), // Tempo
                Constraint::Min(0),     // Tempo slider
            ])
            .split(area);

        let (indicator, style) = mode_indicator(self.state);
        Paragraph::new(indicator).style(style).render(chunks[0], buf);

        let step = if self.state.is_looping() {
            format!("step {:03}", self.step)
        } else {
            "step ---".to_string()
        };
        Paragraph::new(step)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .render(chunks[2], buf);

        Paragraph::new(format!("{:.0} BPM", self.tempo))
            .style(Style::default().fg(Color::Magenta))
            .render(chunks[4], buf);

        let width = chunks[5].width.saturating_sub(2) as usize;
        Paragraph::new(tempo_bar(self.tempo, width))
            .style(Style::default().fg(Color::Magenta))
            .render(chunks[5], buf);
    }
}
