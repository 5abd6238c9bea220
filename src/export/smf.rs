// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Standard MIDI file export.
//!
//! Writes a timeline as a format 0 file: one track holding a single tempo
//! meta-event followed by note-on/note-off pairs on channel 0.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use super::{ExportError, Timeline};
use crate::chords::Pitch;

/// Default ticks per quarter note
pub const DEFAULT_PPQN: u16 = 480;

/// Largest tempo value a set-tempo meta-event can carry
const MAX_TEMPO_MICROS: u32 = 0x00FF_FFFF;

/// Sort rank at equal ticks: meta first, then note-offs, then note-ons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Meta,
    Off,
    On,
}

/// MIDI event for export
#[derive(Debug, Clone)]
struct MidiExportEvent {
    tick: u64,
    rank: Rank,
    data: Vec<u8>,
}

impl MidiExportEvent {
    fn note_on(tick: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            tick,
            rank: Rank::On,
            data: vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
        }
    }

    fn note_off(tick: u64, channel: u8, note: u8) -> Self {
        Self {
            tick,
            rank: Rank::Off,
            data: vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
        }
    }

    fn tempo(micros: u32) -> Self {
        Self {
            tick: 0,
            rank: Rank::Meta,
            data: vec![
                0xFF,
                0x51,
                0x03,
                ((micros >> 16) & 0xFF) as u8,
                ((micros >> 8) & 0xFF) as u8,
                (micros & 0xFF) as u8,
            ],
        }
    }
}

/// Tempo meta value for a BPM, and the BPM ticks must be counted at
///
/// Tempos the meta-event cannot carry are clamped; ticks then follow the
/// clamped file tempo so note times in seconds are kept.
fn file_tempo(bpm: f64) -> (u32, f64) {
    let exact = (60_000_000.0 / bpm).round();
    let micros = exact.clamp(1.0, MAX_TEMPO_MICROS as f64);
    if micros == exact {
        (micros as u32, bpm)
    } else {
        (micros as u32, 60_000_000.0 / micros)
    }
}

/// Convert a 0.0..=1.0 velocity to a MIDI velocity byte, rounding down
pub fn velocity_byte(velocity: f64) -> u8 {
    (velocity.clamp(0.0, 1.0) * 127.0).floor() as u8
}

/// Standard MIDI file writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfWriter {
    ppqn: u16,
    channel: u8,
}

impl SmfWriter {
    pub fn new() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            channel: 0,
        }
    }

    /// Set ticks per quarter note (at least 1, at most 0x7FFF)
    pub fn with_ppqn(mut self, ppqn: u16) -> Self {
        self.ppqn = ppqn.clamp(1, 0x7FFF);
        self
    }

    pub fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// Convert seconds at a tempo to ticks, rounding to the nearest tick
    pub fn seconds_to_ticks(&self, seconds: f64, bpm: f64) -> u64 {
        (seconds * bpm / 60.0 * self.ppqn as f64).round().max(0.0) as u64
    }

    /// Encode a timeline as file bytes
    pub fn to_bytes(&self, timeline: &Timeline) -> Result<Vec<u8>, ExportError> {
        let mut buffer = Vec::new();
        self.write(timeline, &mut buffer)?;
        Ok(buffer)
    }

    /// Write a timeline to a file, replacing it if present
    pub fn write_file<P: AsRef<Path>>(&self, timeline: &Timeline, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path)?);
        self.write(timeline, &mut file)?;
        file.flush()?;
        info!(path = %path.display(), notes = timeline.len(), "MIDI file written");
        Ok(())
    }

    /// Write a timeline to any writer
    pub fn write<W: Write>(&self, timeline: &Timeline, writer: &mut W) -> Result<(), ExportError> {
        let events = self.collect_events(timeline)?;
        self.write_header(writer)?;
        self.write_track(writer, &events)?;
        Ok(())
    }

    fn collect_events(&self, timeline: &Timeline) -> Result<Vec<MidiExportEvent>, ExportError> {
        let (micros, bpm) = file_tempo(timeline.bpm());
        if bpm != timeline.bpm() {
            warn!(bpm = timeline.bpm(), file_bpm = bpm, "tempo outside MIDI range, clamped");
        }
        let mut events = Vec::with_capacity(timeline.len() * 2 + 1);
        events.push(MidiExportEvent::tempo(micros));

        for note in timeline.events() {
            let pitch: Pitch = note
                .pitch
                .parse()
                .map_err(|_| ExportError::InvalidPitch(note.pitch.clone()))?;
            let on = self.seconds_to_ticks(note.start, bpm);
            let off = self.seconds_to_ticks(note.end(), bpm).max(on);
            events.push(MidiExportEvent::note_on(
                on,
                self.channel,
                pitch.midi(),
                velocity_byte(note.velocity),
            ));
            events.push(MidiExportEvent::note_off(off, self.channel, pitch.midi()));
        }

        // Stable, so simultaneous notes keep voicing order
        events.sort_by_key(|e| (e.tick, e.rank));
        Ok(events)
    }

    /// Write MIDI file header chunk
    fn write_header<W: Write>(&self, writer: &mut W) -> Result<(), ExportError> {
        writer.write_all(b"MThd")?;
        writer.write_all(&6u32.to_be_bytes())?;
        // Format 0, one track
        writer.write_all(&0u16.to_be_bytes())?;
        writer.write_all(&1u16.to_be_bytes())?;
        writer.write_all(&self.ppqn.to_be_bytes())?;
        Ok(())
    }

    /// Write a track chunk
    fn write_track<W: Write>(&self, writer: &mut W, events: &[MidiExportEvent]) -> Result<(), ExportError> {
        let mut track_data = Vec::new();
        let mut last_tick = 0u64;

        for event in events {
            let delta = event.tick.saturating_sub(last_tick);
            write_variable_length(&mut track_data, u32::try_from(delta).unwrap_or(0x0FFF_FFFF));
            track_data.extend_from_slice(&event.data);
            last_tick = event.tick;
        }

        // End of track
        write_variable_length(&mut track_data, 0);
        track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

        writer.write_all(b"MTrk")?;
        writer.write_all(&(track_data.len() as u32).to_be_bytes())?;
        writer.write_all(&track_data)?;
        Ok(())
    }
}

impl Default for SmfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Append a variable-length quantity (at most 28 bits)
fn write_variable_length(out: &mut Vec<u8>, value: u32) {
    let mut value = value.min(0x0FFF_FFFF);
    let mut bytes = [0u8; 4];
    let mut len = 0;

    bytes[len] = (value & 0x7F) as u8;
    len += 1;
    value >>= 7;
    while value > 0 {
        bytes[len] = (value & 0x7F) as u8 | 0x80;
        len += 1;
        value >>= 7;
    }

    out.extend(bytes[..len].iter().rev());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::ChordDictionary;
    use crate::export::export_range;
    use crate::progression::{Progression, SlotLayout};

    fn example_timeline() -> Timeline {
        let prog =
            Progression::from_labels(SlotLayout::Four, ["C Maj", "A Min", "F Maj", "G 7"]).unwrap();
        export_range(&prog, &ChordDictionary::builtin(), 0, 4, 120.0).unwrap()
    }

    /// Decode (delta, status-or-meta bytes) pairs from the single track
    fn track_events(bytes: &[u8]) -> Vec<(u32, Vec<u8>)> {
        assert_eq!(&bytes[14..18], b"MTrk");
        let len = u32::from_be_bytes([bytes[18], bytes[19], bytes[20], bytes[21]]) as usize;
        let data = &bytes[22..22 + len];
        let mut events = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let mut delta = 0u32;
            loop {
                let b = data[i];
                i += 1;
                delta = (delta << 7) | (b & 0x7F) as u32;
                if b & 0x80 == 0 {
                    break;
                }
            }
            let size = if data[i] == 0xFF { 3 + data[i + 2] as usize } else { 3 };
            events.push((delta, data[i..i + size].to_vec()));
            i += size;
        }
        events
    }

    #[test]
    fn test_header() {
        let bytes = SmfWriter::new().to_bytes(&example_timeline()).unwrap();
        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(&bytes[4..8], &[0, 0, 0, 6]);
        assert_eq!(&bytes[8..10], &[0, 0]); // Format 0
        assert_eq!(&bytes[10..12], &[0, 1]); // One track
        assert_eq!(&bytes[12..14], &480u16.to_be_bytes());
    }

    #[test]
    fn test_tempo_first() {
        let bytes = SmfWriter::new().to_bytes(&example_timeline()).unwrap();
        let events = track_events(&bytes);
        // 120 BPM = 500000 microseconds per beat = 0x07A120
        assert_eq!(events[0], (0, vec![0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20]));
        assert_eq!(events.iter().filter(|e| e.1[0] == 0xFF && e.1[1] == 0x51).count(), 1);
        assert_eq!(events.last().unwrap().1, vec![0xFF, 0x2F, 0x00]);
    }

    #[test]
    fn test_note_events() {
        let bytes = SmfWriter::new().to_bytes(&example_timeline()).unwrap();
        let events = track_events(&bytes);

        // C4 E4 G4 on at tick 0 with velocity 95
        assert_eq!(events[1], (0, vec![0x90, 60, 95]));
        assert_eq!(events[2], (0, vec![0x90, 64, 95]));
        assert_eq!(events[3], (0, vec![0x90, 67, 95]));

        // Half a second at 120 BPM is one beat: offs then the next chord's ons
        assert_eq!(events[4], (480, vec![0x80, 60, 0]));
        assert_eq!(events[5], (0, vec![0x80, 64, 0]));
        assert_eq!(events[6], (0, vec![0x80, 67, 0]));
        assert_eq!(events[7], (0, vec![0x90, 69, 95]));

        let ons = events.iter().filter(|e| e.1[0] == 0x90).count();
        let offs = events.iter().filter(|e| e.1[0] == 0x80).count();
        assert_eq!(ons, 13);
        assert_eq!(offs, 13);
    }

    #[test]
    fn test_slow_tempo_keeps_note_times() {
        let prog = Progression::from_labels(SlotLayout::Four, ["C Maj", "A Min", "F Maj", "G 7"]).unwrap();
        let timeline = export_range(&prog, &ChordDictionary::builtin(), 0, 2, 2.0).unwrap();
        let bytes = SmfWriter::new().to_bytes(&timeline).unwrap();
        let events = track_events(&bytes);

        // 2 BPM needs 30,000,000 us per beat; the file carries the maximum
        assert_eq!(events[0].1, vec![0xFF, 0x51, 0x03, 0xFF, 0xFF, 0xFF]);

        // The second chord still starts 30 seconds in
        let mut tick = 0u32;
        let mut second_on = None;
        for (delta, data) in &events {
            tick += delta;
            if data[0] == 0x90 && data[1] == 69 {
                second_on = Some(tick);
                break;
            }
        }
        let seconds = second_on.unwrap() as f64 / 480.0 * MAX_TEMPO_MICROS as f64 / 1_000_000.0;
        assert!((seconds - 30.0).abs() < 0.05, "second chord at {}s", seconds);
    }

    #[test]
    fn test_file_tempo() {
        assert_eq!(file_tempo(120.0), (500_000, 120.0));
        let (micros, bpm) = file_tempo(2.0);
        assert_eq!(micros, MAX_TEMPO_MICROS);
        assert!((bpm - 3.5763).abs() < 0.001);
    }

    #[test]
    fn test_velocity_byte() {
        assert_eq!(velocity_byte(0.75), 95);
        assert_eq!(velocity_byte(1.0), 127);
        assert_eq!(velocity_byte(0.0), 0);
        assert_eq!(velocity_byte(2.0), 127);
    }

    #[test]
    fn test_seconds_to_ticks() {
        let writer = SmfWriter::new();
        assert_eq!(writer.seconds_to_ticks(0.5, 120.0), 480);
        assert_eq!(writer.seconds_to_ticks(1.0, 90.0), 720);
        assert_eq!(writer.with_ppqn(96).seconds_to_ticks(2.0, 60.0), 192);
    }

    #[test]
    fn test_variable_length() {
        let mut buffer = Vec::new();
        write_variable_length(&mut buffer, 0);
        assert_eq!(buffer, vec![0x00]);

        buffer.clear();
        write_variable_length(&mut buffer, 127);
        assert_eq!(buffer, vec![0x7F]);

        buffer.clear();
        write_variable_length(&mut buffer, 128);
        assert_eq!(buffer, vec![0x81, 0x00]);

        buffer.clear();
        write_variable_length(&mut buffer, 16383);
        assert_eq!(buffer, vec![0xFF, 0x7F]);
    }

    #[test]
    fn test_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full-progression.mid");
        let timeline = example_timeline();
        let writer = SmfWriter::new();

        writer.write_file(&timeline, &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), writer.to_bytes(&timeline).unwrap());
    }

    #[test]
    fn test_empty_timeline_still_valid() {
        let prog = Progression::default();
        let timeline = export_range(&prog, &ChordDictionary::new(), 0, 8, 100.0).unwrap();
        let bytes = SmfWriter::new().to_bytes(&timeline).unwrap();
        let events = track_events(&bytes);
        assert_eq!(events.len(), 2);
    }
}
