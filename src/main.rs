// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chordflow::audio::InstrumentVoice;
use chordflow::chords::{describe, ChordDictionary};
use chordflow::config::ChordflowConfig;
use chordflow::export::export_range_with_velocity;
use chordflow::playback::PlaybackController;
use chordflow::progression::LoopMode;
use chordflow::timing::{Tempo, TransportClock};
use chordflow::ui::{default_export_dir, App, ExportSettings, Workspace};

const DEFAULT_PLAY_BEATS: u64 = 16;
const LOG_FILE: &str = "chordflow.log";

fn print_usage() {
    println!("chordflow - Chord Progression Sequencer");
    println!();
    println!("Usage: chordflow [--config FILE] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  --list-chords                     List the available chords");
    println!("  --export FILE [--range S C] [--bpm BPM]");
    println!("                                    Write the progression (or C slots from S) as a MIDI file");
    println!("  --play MODE [BEATS]               Loop row1, row2 or all through the audio device (default 16 beats)");
    println!("  --suggest MOOD                    Suggest four chords for a mood");
    println!("  --tui                             Start the terminal interface");
    println!("  --help                            Show this help message");
}

/// Install the log subscriber; `RUST_LOG` overrides the `info` default
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        // The terminal UI owns the screen, so logs go to a file
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {:?}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, what: &str) -> Result<T> {
    let raw = args
        .get(index)
        .ok_or_else(|| anyhow!("Missing {}", what))?;
    raw.parse()
        .map_err(|_| anyhow!("Invalid {}: {}", what, raw))
}

fn build_controller(config: &ChordflowConfig, dictionary: Arc<ChordDictionary>) -> Result<PlaybackController> {
    let voice = Arc::new(InstrumentVoice::new(config.audio_config(), config.synth_params()));
    let tempo = Tempo::new(config.session.tempo).context("Invalid session tempo")?;
    let transport = TransportClock::new(tempo);
    let controller = PlaybackController::new(voice, Box::new(transport), dictionary, config.progression()?)
        .with_options(config.playback_options());
    Ok(controller)
}

fn list_chords(dictionary: &ChordDictionary) {
    for label in dictionary.labels() {
        let notes = dictionary.resolve(label);
        println!("{:<8} {:<16} {}", label, notes.notes().join(" "), describe(label));
    }
}

fn export(config: &ChordflowConfig, dictionary: &ChordDictionary, args: &[String]) -> Result<()> {
    let file = args
        .first()
        .ok_or_else(|| anyhow!("--export requires a file name"))?;
    let progression = config.progression()?;
    let mut start = 0;
    let mut count = progression.len();
    let mut bpm = config.session.tempo;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--range" => {
                start = parse_arg(args, i + 1, "range start")?;
                count = parse_arg(args, i + 2, "range count")?;
                i += 3;
            }
            "--bpm" => {
                bpm = parse_arg(args, i + 1, "tempo")?;
                i += 2;
            }
            other => bail!("Unknown export option: {}", other),
        }
    }

    let timeline = export_range_with_velocity(&progression, dictionary, start, count, bpm, config.export.velocity)?;
    config
        .smf_writer()
        .write_file(&timeline, file)
        .with_context(|| format!("Failed to export {}", file))?;
    println!(
        "Wrote {} notes ({:.2}s at {} BPM) to {}",
        timeline.len(),
        timeline.end_time(),
        bpm,
        file
    );
    Ok(())
}

fn play(config: &ChordflowConfig, dictionary: Arc<ChordDictionary>, mode: LoopMode, beats: u64) -> Result<()> {
    let mut controller = build_controller(config, dictionary)?;
    let mut highlight = controller.subscribe_highlight();
    controller.start_loop(mode)?;
    println!("Looping {} at {} BPM for {} beats (Ctrl+C to stop)...", mode, controller.tempo(), beats);

    let mut shown = None;
    while controller.step_counter() < beats {
        let slot = highlight.poll_frame(Instant::now());
        if slot != shown {
            shown = slot;
            if let Some(index) = slot {
                let progression = controller.progression();
                println!("  slot {}: {}", index + 1, progression.get(index).unwrap_or_default());
            }
        }
        thread::sleep(Duration::from_millis(5));
    }

    // Let the last chord ring for its full step
    thread::sleep(Tempo::new(controller.tempo())?.interval(controller.options().loop_interval));
    controller.shutdown();
    // Release tail
    thread::sleep(Duration::from_millis(1200));
    println!("Done.");
    Ok(())
}

fn suggest(config: &ChordflowConfig, dictionary: Arc<ChordDictionary>, mood: &str) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let suggester = config.suggester(dictionary)?;
    let suggestion = runtime.block_on(suggester.suggest(mood));

    println!("{}", suggestion.chords.join(" | "));
    if let Some(message) = suggestion.message() {
        println!("{}", message);
    }
    Ok(())
}

fn run_tui(config: &ChordflowConfig, dictionary: Arc<ChordDictionary>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let controller = build_controller(config, Arc::clone(&dictionary))?;
    let suggester = config.suggester(dictionary)?;
    let export = ExportSettings {
        writer: config.smf_writer(),
        velocity: config.export.velocity,
        directory: default_export_dir(),
    };
    let mut workspace = Workspace::new(controller, suggester, runtime.handle().clone(), export);

    info!("terminal UI started");
    let mut app = App::new().context("Failed to initialize terminal")?;
    app.run(&mut workspace).context("Terminal UI failed")?;
    info!("terminal UI closed");
    Ok(())
}

fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            eprintln!("Error: --config requires a file path");
            std::process::exit(1);
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    let Some(command) = args.first().cloned() else {
        println!("chordflow - Chord Progression Sequencer");
        println!("Run with --help for usage information");
        return Ok(());
    };
    if command == "--help" || command == "-h" {
        print_usage();
        return Ok(());
    }

    let log_file = (command == "--tui").then(|| env::temp_dir().join(LOG_FILE));
    init_logging(log_file.as_deref())?;

    let config = match &config_path {
        Some(path) => ChordflowConfig::load(path)?,
        None => ChordflowConfig::default(),
    };
    let dictionary = Arc::new(config.dictionary()?);

    match command.as_str() {
        "--list-chords" => list_chords(&dictionary),
        "--export" => export(&config, &dictionary, &args[1..])?,
        "--play" => {
            let mode: LoopMode = args
                .get(1)
                .ok_or_else(|| anyhow!("--play requires a mode (row1, row2 or all)"))?
                .parse()
                .map_err(|e: String| anyhow!(e))?;
            let beats = if args.len() >= 3 {
                parse_arg(&args, 2, "beat count")?
            } else {
                DEFAULT_PLAY_BEATS
            };
            play(&config, dictionary, mode, beats)?;
        }
        "--suggest" => {
            let mood = args[1..].join(" ");
            suggest(&config, dictionary, &mood)?;
        }
        "--tui" => {
            if let Some(path) = &log_file {
                eprintln!("Logging to {}", path.display());
            }
            run_tui(&config, dictionary)?;
        }
        other => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
