// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for chordflow.
//!
//! A single YAML file with one section per subsystem. Every section has
//! defaults, so an empty file (or no file) gives a working setup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioConfig, SynthParams};
use crate::audio::effects::ChorusParams;
use crate::chords::ChordDictionary;
use crate::export::{SmfWriter, DEFAULT_PPQN, EXPORT_VELOCITY};
use crate::playback::PlaybackOptions;
use crate::progression::{Progression, SlotLayout};
use crate::suggest::{CommandBackend, MoodSuggester, DEFAULT_API_KEY_ENV};
use crate::timing::NoteValue;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ChordflowConfig {
    pub session: SessionConfig,
    pub playback: PlaybackConfig,
    pub audio: AudioSettings,
    pub export: ExportConfig,
    pub chords: ChordsConfig,
    pub suggest: SuggestConfig,
}

impl ChordflowConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Invalid config file: {:?}", path.as_ref()))?;

        // A relative chord table is found next to the config file
        if let (Some(table), Some(dir)) = (config.chords.file.as_mut(), path.as_ref().parent()) {
            if table.is_relative() {
                *table = dir.join(&*table);
            }
        }
        Ok(config)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        let tempo = self.session.tempo;
        if !tempo.is_finite() || tempo <= 0.0 {
            bail!("session.tempo must be positive, got {}", tempo);
        }
        if let Some(labels) = &self.session.progression {
            let expected = self.session.layout.len();
            if labels.len() != expected {
                bail!(
                    "session.progression has {} chords but the {:?} layout needs {}",
                    labels.len(),
                    self.session.layout,
                    expected
                );
            }
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if !(0.0..=1.0).contains(&self.export.velocity) {
            bail!("export.velocity must be between 0.0 and 1.0, got {}", self.export.velocity);
        }
        if self.export.ppqn == 0 {
            bail!("export.ppqn must be positive");
        }
        if let Some(command) = &self.suggest.command {
            if command.is_empty() {
                bail!("suggest.command must name a program");
            }
        }
        Ok(())
    }

    /// Starting progression for the configured layout
    pub fn progression(&self) -> Result<Progression> {
        match &self.session.progression {
            Some(labels) => Progression::from_labels(self.session.layout, labels.iter().cloned())
                .context("Invalid session.progression"),
            None => Ok(Progression::default_for(self.session.layout)),
        }
    }

    /// Built-in chords plus the configured extra table
    pub fn dictionary(&self) -> Result<ChordDictionary> {
        let mut dictionary = ChordDictionary::builtin();
        if let Some(path) = &self.chords.file {
            let extra = ChordDictionary::load(path)
                .with_context(|| format!("Failed to load chord table: {:?}", path))?;
            dictionary.extend(extra);
        }
        Ok(dictionary)
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        PlaybackOptions {
            preview_length: self.playback.preview_length,
            preview_highlight: Duration::from_millis(self.playback.preview_highlight_ms),
            edit_preview_length: self.playback.edit_preview_length,
            loop_interval: self.playback.loop_interval,
            ..PlaybackOptions::default()
        }
    }

    pub fn audio_config(&self) -> AudioConfig {
        AudioConfig::new(self.audio.sample_rate, self.audio.buffer_size)
    }

    pub fn synth_params(&self) -> SynthParams {
        SynthParams {
            volume_db: self.audio.volume_db,
            reverb: self.audio.reverb,
            chorus: self.audio.chorus.then(ChorusParams::default),
            ..SynthParams::default()
        }
    }

    pub fn smf_writer(&self) -> SmfWriter {
        SmfWriter::new().with_ppqn(self.export.ppqn)
    }

    /// Suggester using the configured command, if any
    pub fn suggester(&self, dictionary: Arc<ChordDictionary>) -> Result<MoodSuggester> {
        let suggester = MoodSuggester::new(dictionary)
            .with_timeout(Duration::from_millis(self.suggest.timeout_ms));
        match &self.suggest.command {
            Some(argv) => {
                let backend = CommandBackend::new(argv.iter().cloned())
                    .context("Invalid suggest.command")?
                    .with_api_key_env(self.suggest.api_key_env.clone());
                Ok(suggester.with_backend(backend))
            }
            None => Ok(suggester),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Tempo in BPM
    pub tempo: f64,
    pub layout: SlotLayout,
    /// Starting chords; the default progression when absent
    pub progression: Option<Vec<String>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tempo: 90.0,
            layout: SlotLayout::Eight,
            progression: None,
        }
    }
}

/// Note lengths used by the playback controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub preview_length: NoteValue,
    pub preview_highlight_ms: u64,
    pub edit_preview_length: NoteValue,
    pub loop_interval: NoteValue,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            preview_length: NoteValue::Quarter,
            preview_highlight_ms: 500,
            edit_preview_length: NoteValue::Eighth,
            loop_interval: NoteValue::Quarter,
        }
    }
}

/// Audio device and instrument settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Buffer size in frames (clamped to 64..=4096)
    pub buffer_size: u32,
    /// Output level in dB
    pub volume_db: f32,
    pub reverb: bool,
    pub chorus: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            volume_db: -10.0,
            reverb: true,
            chorus: true,
        }
    }
}

/// MIDI export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Ticks per quarter note
    pub ppqn: u16,
    /// Note velocity as a fraction of full scale
    pub velocity: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ppqn: DEFAULT_PPQN,
            velocity: EXPORT_VELOCITY,
        }
    }
}

/// Extra chord vocabulary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ChordsConfig {
    /// YAML table of `label: [pitch, ...]` merged over the built-in chords
    pub file: Option<PathBuf>,
}

/// Mood suggestion settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SuggestConfig {
    /// Command to run, program first
    pub command: Option<Vec<String>>,
    /// Environment variable that must hold the service credential
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            command: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ChordflowConfig::default();
        assert_eq!(config.session.tempo, 90.0);
        assert_eq!(config.session.layout, SlotLayout::Eight);
        assert_eq!(config.playback.preview_length, NoteValue::Quarter);
        assert_eq!(config.audio.buffer_size, 512);
        assert_eq!(config.export.ppqn, 480);
        assert_eq!(config.export.velocity, 0.75);
        assert_eq!(config.suggest.api_key_env, "API_KEY");
        assert_eq!(config.suggest.timeout_ms, 15_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_and_minimal_yaml() {
        assert_eq!(ChordflowConfig::from_yaml("").unwrap(), ChordflowConfig::default());

        let config = ChordflowConfig::from_yaml("session:\n  tempo: 140\n").unwrap();
        assert_eq!(config.session.tempo, 140.0);
        assert_eq!(config.session.layout, SlotLayout::Eight);
        assert_eq!(config.audio, AudioSettings::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
session:
  tempo: 100
  layout: four
  progression: ["D Min", "G 7", "C Maj", "C Maj"]
playback:
  preview_length: "2n"
  preview_highlight_ms: 250
  loop_interval: "8n"
audio:
  buffer_size: 10
  volume_db: -6
  chorus: false
export:
  ppqn: 96
suggest:
  command: ["chord-oracle", "--json"]
  api_key_env: ORACLE_KEY
  timeout_ms: 2000
"#;
        let config = ChordflowConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.session.layout, SlotLayout::Four);

        let progression = config.progression().unwrap();
        assert_eq!(progression.labels(), &["D Min", "G 7", "C Maj", "C Maj"]);

        let options = config.playback_options();
        assert_eq!(options.preview_length, NoteValue::Half);
        assert_eq!(options.preview_highlight, Duration::from_millis(250));
        assert_eq!(options.loop_interval, NoteValue::Eighth);
        assert_eq!(options.edit_preview_length, NoteValue::Eighth);

        // Buffer size is clamped when building the device config
        assert_eq!(config.audio_config().buffer_size, 64);
        let params = config.synth_params();
        assert_eq!(params.volume_db, -6.0);
        assert!(params.chorus.is_none());
        assert!(params.reverb);

        assert_eq!(config.smf_writer().ppqn(), 96);
        assert_eq!(config.suggest.command.as_deref().map(|c| c.len()), Some(2));
    }

    #[test]
    fn test_rejects_wrong_progression_length() {
        let yaml = "session:\n  layout: eight\n  progression: [\"C Maj\", \"G Maj\"]\n";
        assert!(ChordflowConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ChordflowConfig::from_yaml("session:\n  tempo: 0\n").is_err());
        assert!(ChordflowConfig::from_yaml("session:\n  tempo: -30\n").is_err());
        assert!(ChordflowConfig::from_yaml("export:\n  velocity: 1.5\n").is_err());
        assert!(ChordflowConfig::from_yaml("playback:\n  loop_interval: \"3n\"\n").is_err());
        assert!(ChordflowConfig::from_yaml("suggest:\n  command: []\n").is_err());
        assert!(ChordflowConfig::from_yaml("session: [").is_err());
    }

    #[test]
    fn test_round_trip() {
        let mut config = ChordflowConfig::default();
        config.session.tempo = 123.0;
        config.session.progression = Some(
            ["A Min", "F Maj", "C Maj", "G Maj", "A Min", "F Maj", "C Maj", "E 7"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        let yaml = config.to_yaml().unwrap();
        assert_eq!(ChordflowConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_save_and_load_with_chord_table() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("extra.yaml"), "C Sus4: [C4, F4, G4]\n").unwrap();

        let path = dir.path().join("chordflow.yaml");
        let mut config = ChordflowConfig::default();
        config.chords.file = Some(PathBuf::from("extra.yaml"));
        config.save(&path).unwrap();

        let loaded = ChordflowConfig::load(&path).unwrap();
        assert_eq!(loaded.chords.file, Some(dir.path().join("extra.yaml")));

        let dictionary = loaded.dictionary().unwrap();
        assert_eq!(dictionary.len(), 34);
        assert_eq!(dictionary.resolve("C Sus4").notes(), &["C4", "F4", "G4"]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(ChordflowConfig::load(dir.path().join("nope.yaml")).is_err());
    }

    #[test]
    fn test_suggester_from_config() {
        let dictionary = Arc::new(ChordDictionary::builtin());
        let config = ChordflowConfig::default();
        assert!(!config.suggester(Arc::clone(&dictionary)).unwrap().has_backend());

        let config = ChordflowConfig::from_yaml("suggest:\n  command: [\"cat\"]\n").unwrap();
        assert!(config.suggester(dictionary).unwrap().has_backend());
    }
}
