//! External collaborators
//!
//! The speech recognizer, translator, audio recorder, and re-encoder are
//! opaque systems as far as the vault is concerned. This module defines the
//! narrow blocking contracts the pipeline calls them through, plus
//! implementations that shell out to user-configured external commands.
//! Internals of the collaborators (model loading, API access, codecs) are
//! deliberately out of scope.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Result of a speech-to-text invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    /// Language code detected by the recognizer, e.g. "en".
    pub language: String,
}

/// Speech-to-text collaborator.
///
/// Implementations hold whatever model or session state they need; the
/// pipeline receives the handle explicitly and never manages a hidden
/// global model.
pub trait Transcriber {
    fn transcribe(&self, audio: &[u8]) -> Result<Transcript>;
}

/// Text translation collaborator.
pub trait Translator {
    fn translate(&self, text: &str, target_language: &str) -> Result<String>;
}

/// Audio capture collaborator. Yields raw audio container bytes.
pub trait Recorder {
    fn record(&mut self) -> Result<Vec<u8>>;
}

/// Audio container re-encoding collaborator.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Transcriber backed by an external command
///
/// Runs `program <audio-file>` with the audio written to a tempfile and
/// expects a JSON object `{"text": "...", "language": "..."}` on stdout.
/// This matches the common whisper-cli style of tooling without binding the
/// crate to any particular model runtime.
pub struct CommandTranscriber {
    program: String,
}

#[derive(Deserialize)]
struct CommandTranscript {
    text: String,
    language: String,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<Transcript> {
        let tmp = tempfile::NamedTempFile::new().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to create tempfile for transcription input",
                e,
            )
        })?;
        std::fs::write(tmp.path(), audio).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to write transcription input",
                e,
            )
        })?;

        debug!(program = %self.program, bytes = audio.len(), "invoking transcriber");
        let output = run_collaborator(&self.program, &[tmp.path().as_os_str().to_os_string()])?;

        let parsed: CommandTranscript = serde_json::from_slice(&output).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Collaborator,
                format!("transcriber '{}' produced unparseable output", self.program),
                e,
            )
        })?;
        Ok(Transcript {
            text: parsed.text,
            language: parsed.language,
        })
    }
}

/// Translator backed by an external command
///
/// Runs `program <target-language>` with the source text on stdin and reads
/// the translated text from stdout.
pub struct CommandTranslator {
    program: String,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Translator for CommandTranslator {
    fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        use std::io::Write;
        use std::process::Stdio;

        debug!(program = %self.program, target = target_language, "invoking translator");
        let mut child = Command::new(&self.program)
            .arg(target_language)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.program, e))?;

        // Scope the handle so stdin closes before we wait
        {
            let stdin = child.stdin.as_mut().ok_or_else(|| {
                VaultError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::InternalInvariant,
                    "translator child has no stdin handle",
                )
            })?;
            stdin.write_all(text.as_bytes()).map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Collaborator,
                    format!("failed to feed text to translator '{}'", self.program),
                    e,
                )
            })?;
        }

        let output = child.wait_with_output().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Collaborator,
                format!("failed to wait for translator '{}'", self.program),
                e,
            )
        })?;
        check_status(&self.program, &output)?;

        let translated = String::from_utf8(output.stdout).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Collaborator,
                format!("translator '{}' produced non-UTF-8 output", self.program),
                e,
            )
        })?;
        Ok(translated.trim_end_matches('\n').to_string())
    }
}

/// Transcoder backed by an external command (typically an ffmpeg wrapper)
///
/// Runs `program <input> <output>`.
pub struct CommandTranscoder {
    program: String,
}

impl CommandTranscoder {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Transcoder for CommandTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        debug!(program = %self.program, input = %input.display(), output = %output.display(), "invoking transcoder");
        run_collaborator(
            &self.program,
            &[
                input.as_os_str().to_os_string(),
                output.as_os_str().to_os_string(),
            ],
        )?;
        Ok(())
    }
}

fn run_collaborator(program: &str, args: &[std::ffi::OsString]) -> Result<Vec<u8>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| spawn_error(program, e))?;
    check_status(program, &output)?;
    Ok(output.stdout)
}

fn spawn_error(program: &str, err: std::io::Error) -> VaultError {
    VaultError::with_kind_and_source(
        ErrorCategory::User,
        ErrorKind::Collaborator,
        format!("failed to run collaborator '{}'", program),
        err,
    )
}

fn check_status(program: &str, output: &std::process::Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(VaultError::with_kind(
        ErrorCategory::Internal,
        ErrorKind::Collaborator,
        format!(
            "collaborator '{}' failed ({}): {}",
            program,
            output.status,
            stderr.trim()
        ),
    ))
}
