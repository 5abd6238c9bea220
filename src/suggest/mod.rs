// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Mood-to-chords suggestions.
//!
//! A completion backend is asked for four chords matching a mood. Any
//! failure falls back to a fixed progression with an advisory message; a
//! suggestion never fails outright.

pub mod backend;

pub use backend::{CommandBackend, CompletionBackend, CompletionFuture, SuggestionRequest, DEFAULT_API_KEY_ENV};

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::chords::{ChordDictionary, ChordLabel};

/// Chords in every suggestion
pub const SUGGESTION_LENGTH: usize = 4;

/// Returned whenever a suggestion cannot be produced
pub const FALLBACK_PROGRESSION: [&str; SUGGESTION_LENGTH] = ["C Maj", "G Maj", "A Min", "F Maj"];

/// Replacement for a suggested chord that is not in the dictionary
pub const UNKNOWN_CHORD_REPLACEMENT: &str = "C Maj";

/// Default time allowed for a backend to answer
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Suggestion errors; all of them end in the fallback progression
#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("mood is empty")]
    EmptyMood,
    #[error("no suggestion backend configured")]
    NoBackend,
    #[error("credential variable {0} is not set")]
    MissingCredential(String),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to start suggestion command: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("suggestion command I/O failed: {0}")]
    Io(#[source] std::io::Error),
    #[error("suggestion command exited with status {status:?}: {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },
    #[error("malformed suggestion response: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("expected 4 chords, got {0}")]
    WrongCount(usize),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Response body expected from a backend
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    chords: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Suggested chords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Exactly four known chord labels
    pub chords: Vec<ChordLabel>,
    /// Why the chords fit the mood, when the backend said
    pub description: Option<String>,
    /// Set when the fallback was used
    pub advisory: Option<String>,
}

impl Suggestion {
    /// The fixed fallback with an advisory message
    pub fn fallback(advisory: impl Into<String>) -> Self {
        Self {
            chords: FALLBACK_PROGRESSION.iter().map(|c| c.to_string()).collect(),
            description: None,
            advisory: Some(advisory.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.advisory.is_some()
    }

    /// Chords repeated in order to fill `len` slots
    pub fn labels_for(&self, len: usize) -> Vec<ChordLabel> {
        self.chords.iter().cycle().take(len).cloned().collect()
    }

    /// Message to show the user: the advisory, else the description
    pub fn message(&self) -> Option<&str> {
        self.advisory.as_deref().or(self.description.as_deref())
    }
}

/// Asks a backend for chords matching a mood
pub struct MoodSuggester {
    backend: Option<Box<dyn CompletionBackend>>,
    dictionary: Arc<ChordDictionary>,
    timeout: Duration,
}

impl MoodSuggester {
    /// Create a suggester without a backend; every request falls back
    pub fn new(dictionary: Arc<ChordDictionary>) -> Self {
        Self {
            backend: None,
            dictionary,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_backend<B: CompletionBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Build the backend request for a mood
    pub fn request_for(&self, mood: &str) -> SuggestionRequest {
        let allowed = self.dictionary.available_chords();
        let system_instruction = format!(
            "You are an expert music composer and theorist.\n\
             Your task is to generate {n}-chord progressions based on a user's requested mood or style.\n\
             You must ONLY use chords from the following list: {list}.\n\
             If a requested mood implies a chord not in the list, substitute it with the best available alternative from the list.\n\
             Ensure the progression is musically coherent.\n\
             Answer with JSON only: {{\"chords\": [{n} chord names], \"description\": \"a very brief explanation\"}}.",
            n = SUGGESTION_LENGTH,
            list = allowed.join(", "),
        );
        SuggestionRequest {
            system_instruction,
            prompt: format!(
                "Generate a {}-chord progression for a \"{}\" vibe.",
                SUGGESTION_LENGTH,
                mood.trim()
            ),
            allowed_chords: allowed,
        }
    }

    /// Map a raw backend response onto known chords
    ///
    /// Unknown labels are matched ignoring case, else replaced with
    /// [`UNKNOWN_CHORD_REPLACEMENT`]. Any count other than four is an error.
    pub fn normalize(&self, response: &str) -> Result<(Vec<ChordLabel>, Option<String>), SuggestError> {
        let raw: RawSuggestion =
            serde_json::from_str(strip_code_fence(response)).map_err(SuggestError::Malformed)?;
        if raw.chords.len() != SUGGESTION_LENGTH {
            return Err(SuggestError::WrongCount(raw.chords.len()));
        }

        let chords = raw
            .chords
            .iter()
            .map(|label| {
                if self.dictionary.contains(label) {
                    label.clone()
                } else {
                    self.dictionary
                        .find_case_insensitive(label)
                        .unwrap_or(UNKNOWN_CHORD_REPLACEMENT)
                        .to_string()
                }
            })
            .collect();
        let description = raw.description.filter(|d| !d.trim().is_empty());
        Ok((chords, description))
    }

    /// Ask the backend, reporting why a suggestion could not be made
    pub async fn try_suggest(&self, mood: &str) -> Result<Suggestion, SuggestError> {
        if mood.trim().is_empty() {
            return Err(SuggestError::EmptyMood);
        }
        let backend = self.backend.as_ref().ok_or(SuggestError::NoBackend)?;
        let request = self.request_for(mood);

        let response = tokio::time::timeout(self.timeout, backend.complete(&request))
            .await
            .map_err(|_| SuggestError::Timeout(self.timeout))??;

        let (chords, description) = self.normalize(&response)?;
        Ok(Suggestion {
            chords,
            description,
            advisory: None,
        })
    }

    /// Ask the backend, falling back to a fixed progression on any failure
    pub async fn suggest(&self, mood: &str) -> Suggestion {
        match self.try_suggest(mood).await {
            Ok(suggestion) => {
                info!(mood = mood.trim(), chords = ?suggestion.chords, "suggestion received");
                suggestion
            }
            Err(err) => {
                warn!(mood = mood.trim(), "suggestion failed, using fallback: {}", err);
                Suggestion::fallback(format!("Failed to generate ({}). Try a different mood.", err))
            }
        }
    }
}

/// Drop a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an info string such as "json"
    let body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
