// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Performance benchmarks for chordflow
//!
//! Run with: cargo bench
//!
//! These benchmarks measure:
//! - Timeline export and MIDI encoding
//! - Synth rendering at typical buffer sizes
//! - Chord resolution and pitch parsing

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chordflow::audio::PolySynth;
use chordflow::chords::{ChordDictionary, Pitch};
use chordflow::export::{export_range, SmfWriter};
use chordflow::progression::Progression;

/// Benchmark rendering a progression to a timeline
fn bench_export_timeline(c: &mut Criterion) {
    let dictionary = ChordDictionary::builtin();
    let progression = Progression::default();

    c.bench_function("export_range_8_slots", |b| {
        b.iter(|| {
            let timeline = export_range(
                black_box(&progression),
                &dictionary,
                0,
                progression.len(),
                black_box(120.0),
            );
            black_box(timeline)
        })
    });
}

/// Benchmark encoding a timeline as a Standard MIDI File
fn bench_smf_encoding(c: &mut Criterion) {
    let dictionary = ChordDictionary::builtin();
    let progression = Progression::default();
    let timeline = export_range(&progression, &dictionary, 0, progression.len(), 120.0)
        .expect("default progression exports");
    let writer = SmfWriter::new();

    c.bench_function("smf_to_bytes", |b| {
        b.iter(|| black_box(writer.to_bytes(black_box(&timeline))))
    });
}

/// Benchmark synth rendering with a chord sounding
fn bench_synth_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("synth_render");
    let dictionary = ChordDictionary::builtin();
    let chord = dictionary.resolve("G 7");

    for frames in [64usize, 256, 512, 1024].iter() {
        group.bench_with_input(BenchmarkId::new("stereo", frames), frames, |b, &frames| {
            let mut synth = PolySynth::new(44100.0);
            let mut buffer = vec![0.0f32; frames * 2];
            b.iter(|| {
                if synth.active_voice_count() == 0 {
                    for pitch in chord.pitches() {
                        synth.note_on(pitch.midi(), pitch.frequency(), Duration::from_millis(500));
                    }
                }
                synth.render(&mut buffer, 2);
                black_box(buffer[0])
            })
        });
    }

    group.finish();
}

/// Benchmark voice stealing when every slot is busy
fn bench_voice_stealing(c: &mut Criterion) {
    c.bench_function("note_on_full_pool", |b| {
        let mut synth = PolySynth::new(44100.0);
        let mut note = 36u8;
        b.iter(|| {
            note = if note >= 96 { 36 } else { note + 1 };
            synth.note_on(note, 440.0, Duration::from_secs(10));
            black_box(synth.active_voice_count())
        })
    });
}

/// Benchmark chord lookup and pitch parsing
fn bench_chord_resolution(c: &mut Criterion) {
    let dictionary = ChordDictionary::builtin();
    let labels = dictionary.available_chords();

    c.bench_function("resolve_all_chords", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for label in &labels {
                total += dictionary.resolve(black_box(label)).len();
            }
            black_box(total)
        })
    });

    c.bench_function("parse_pitch", |b| {
        b.iter(|| black_box("F#4".parse::<Pitch>()))
    });
}

criterion_group!(
    benches,
    bench_export_timeline,
    bench_smf_encoding,
    bench_synth_render,
    bench_voice_stealing,
    bench_chord_resolution,
);

criterion_main!(benches);
