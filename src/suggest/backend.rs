// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Completion backends for mood suggestions.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::SuggestError;

/// Environment variable holding the service credential by default
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

/// Request sent to a completion backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionRequest {
    /// Role and rules for the model, including the allowed chords
    pub system_instruction: String,
    /// The user-facing ask
    pub prompt: String,
    /// Labels the answer must be drawn from
    pub allowed_chords: Vec<String>,
}

/// Boxed future returned by [`CompletionBackend::complete`]
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<String, SuggestError>> + Send + 'a>>;

/// A text completion service
///
/// Implementations return the raw response text, expected to be JSON of the
/// form `{"chords": [...], "description": "..."}`.
pub trait CompletionBackend: Send + Sync {
    fn complete<'a>(&'a self, request: &'a SuggestionRequest) -> CompletionFuture<'a>;
}

/// Backend that runs a command, writing the request JSON to its stdin and
/// reading the response from its stdout
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    api_key_env: String,
}

impl CommandBackend {
    /// Create from an argv list; the first element is the program
    pub fn new<I, S>(argv: I) -> Result<Self, SuggestError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .filter(|p: &String| !p.trim().is_empty())
            .ok_or(SuggestError::NoBackend)?;
        Ok(Self {
            program,
            args: argv.collect(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        })
    }

    /// Name the environment variable that must hold the credential
    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn api_key_env(&self) -> &str {
        &self.api_key_env
    }

    async fn run(&self, request: &SuggestionRequest) -> Result<String, SuggestError> {
        let has_key = std::env::var(&self.api_key_env)
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        if !has_key {
            return Err(SuggestError::MissingCredential(self.api_key_env.clone()));
        }

        let payload = serde_json::to_vec(request).map_err(SuggestError::Encode)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(SuggestError::Spawn)?;
        debug!(program = %self.program, "suggestion command started");

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                // A command may answer without reading its input
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                other => other.map_err(SuggestError::Io)?,
            }
            // Closing stdin signals the end of the request
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(SuggestError::Io)?;
        if !output.status.success() {
            return Err(SuggestError::CommandFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl CompletionBackend for CommandBackend {
    fn complete<'a>(&'a self, request: &'a SuggestionRequest) -> CompletionFuture<'a> {
        Box::pin(self.run(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SuggestionRequest {
        SuggestionRequest {
            system_instruction: "rules".to_string(),
            prompt: "Generate a 4-chord progression for a \"calm\" vibe.".to_string(),
            allowed_chords: vec!["C Maj".to_string()],
        }
    }

    #[test]
    fn test_empty_argv_rejected() {
        assert!(matches!(
            CommandBackend::new(Vec::<String>::new()),
            Err(SuggestError::NoBackend)
        ));
        assert!(matches!(CommandBackend::new([" "]), Err(SuggestError::NoBackend)));
    }

    #[test]
    fn test_argv_split() {
        let backend = CommandBackend::new(["suggest-chords", "--model", "small"]).unwrap();
        assert_eq!(backend.program(), "suggest-chords");
        assert_eq!(backend.args, vec!["--model", "small"]);
        assert_eq!(backend.api_key_env(), DEFAULT_API_KEY_ENV);
    }

    #[test]
    fn test_request_serializes() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["system_instruction"], "rules");
        assert_eq!(json["allowed_chords"][0], "C Maj");
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let backend = CommandBackend::new(["cat"])
            .unwrap()
            .with_api_key_env("CHORDFLOW_TEST_UNSET_KEY");
        let result = backend.complete(&request()).await;
        assert!(matches!(result, Err(SuggestError::MissingCredential(name)) if name == "CHORDFLOW_TEST_UNSET_KEY"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_echoes_stdout() {
        // PATH is always set, so it doubles as a present credential
        let backend = CommandBackend::new(["sh", "-c", "cat > /dev/null; echo '{\"chords\":[]}'"])
            .unwrap()
            .with_api_key_env("PATH");
        let text = backend.complete(&request()).await.unwrap();
        assert_eq!(text.trim(), "{\"chords\":[]}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_failure() {
        let backend = CommandBackend::new(["sh", "-c", "cat > /dev/null; echo boom >&2; exit 3"])
            .unwrap()
            .with_api_key_env("PATH");
        match backend.complete(&request()).await {
            Err(SuggestError::CommandFailed { status, stderr }) => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
