// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Chord slot grid widget.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::chords::{describe, ChordDictionary};
use crate::progression::{Progression, ROW_LENGTH};

/// Grid of chord slots, one row of four per progression row
pub struct SlotGridWidget<'a> {
    progression: &'a Progression,
    dictionary: &'a ChordDictionary,
    selected: usize,
    highlighted: Option<usize>,
    block: Option<Block<'a>>,
}

impl<'a> SlotGridWidget<'a> {
    pub fn new(progression: &'a Progression, dictionary: &'a ChordDictionary) -> Self {
        Self {
            progression,
            dictionary,
            selected: 0,
            highlighted: None,
            block: None,
        }
    }

    /// Slot with the edit cursor
    pub fn selected(mut self, index: usize) -> Self {
        self.selected = index;
        self
    }

    /// Slot currently sounding
    pub fn highlighted(mut self, index: Option<usize>) -> Self {
        self.highlighted = index;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn slot_style(&self, index: usize) -> Style {
        if self.highlighted == Some(index) {
            Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
        } else if self.selected == index {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        }
    }

    fn render_slot(&self, index: usize, label: &str, area: Rect, buf: &mut Buffer) {
        let style = self.slot_style(index);
        let border = if self.selected == index {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {} ", index + 1));
        let inner = block.inner(area);
        block.render(area, buf);

        let notes = self.dictionary.resolve(label);
        let notes_text = if notes.is_empty() {
            "(silent)".to_string()
        } else {
            notes.notes().join(" ")
        };
        let lines = vec![
            Line::from(Span::styled(label.to_string(), style)),
            Line::from(Span::styled(notes_text, Style::default().fg(Color::Cyan))),
            Line::from(Span::styled(describe(label), Style::default().fg(Color::DarkGray))),
        ];
        Paragraph::new(lines).style(style).render(inner, buf);
    }
}

impl Widget for SlotGridWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block.clone() {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let labels = self.progression.labels();
        let rows: Vec<&[String]> = labels.chunks(ROW_LENGTH).collect();
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(rows.iter().map(|_| Constraint::Length(5)).collect::<Vec<_>>())
            .split(area);

        for (row, (chords, row_area)) in rows.iter().zip(row_areas.iter()).enumerate() {
            let cells = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, ROW_LENGTH as u32); ROW_LENGTH])
                .split(*row_area);
            for (col, (label, cell)) in chords.iter().zip(cells.iter()).enumerate() {
                self.render_slot(row * ROW_LENGTH + col, label, *cell, buf);
            }
        }
    }
}
