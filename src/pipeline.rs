//! Pipeline orchestration
//!
//! Sequences a single run over one asset:
//! Acquiring -> Decrypting -> Processing -> ReEncrypting -> Done.
//!
//! The failure policy is the whole point of this module. Acquisition and
//! decryption failures stop the run with the asset still encrypted.
//! Processing failures (transcription/translation) are captured locally and
//! the run *continues* to re-encryption, because the asset was decrypted and
//! its confidentiality must be restored no matter what the collaborators
//! did. Re-encryption failure is the one unrecoverable outcome: the asset is
//! left plaintext on disk and that fact is surfaced loudly.
//!
//! One run per asset at a time; callers serialize access per path.

use crate::collab::{Transcriber, Translator};
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::password::PasswordReader;
use crate::source::Source;
use crate::vault;
use std::fmt;
use std::fs;
use tracing::{error, info, warn};

/// Pipeline stage, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Acquiring,
    Decrypting,
    Processing,
    ReEncrypting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquiring => "acquiring",
            Stage::Decrypting => "decrypting",
            Stage::Processing => "processing",
            Stage::ReEncrypting => "re-encrypting",
        };
        f.write_str(name)
    }
}

/// Output of a successful run. Not persisted by the pipeline; persistence,
/// if any, is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptResult {
    pub text: String,
    pub detected_language: String,
    pub translated_text: Option<String>,
}

/// A terminal pipeline failure, attributed to the stage that caused it.
#[derive(Debug)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: VaultError,
    /// True only when re-encryption failed: the asset sits unencrypted on
    /// disk and needs user attention.
    pub asset_left_plaintext: bool,
}

/// Terminal state of a pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(TranscriptResult),
    Failed(PipelineFailure),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Orchestrates one acquisition/decrypt/process/re-encrypt cycle.
///
/// Collaborators are explicitly passed handles; the pipeline owns no model
/// state of its own, so runs are composable and testable in isolation.
pub struct Pipeline<'a> {
    transcriber: &'a dyn Transcriber,
    translator: Option<&'a dyn Translator>,
}

impl<'a> Pipeline<'a> {
    pub fn new(transcriber: &'a dyn Transcriber) -> Self {
        Self {
            transcriber,
            translator: None,
        }
    }

    pub fn with_translator(mut self, translator: &'a dyn Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Drive one run to a terminal state.
    ///
    /// `target_language`, when set, requests translation of the transcript
    /// after transcription. The password is captured once during acquisition
    /// and reused verbatim for the decrypt/re-encrypt pair; it is never
    /// re-prompted mid-run.
    pub fn run(
        &self,
        source: &mut Source<'_>,
        password_reader: &mut dyn PasswordReader,
        target_language: Option<&str>,
    ) -> RunOutcome {
        info!(stage = %Stage::Acquiring, "pipeline started");
        let acquired = match source.acquire(password_reader) {
            Ok(acquired) => acquired,
            Err(e) => return fail(Stage::Acquiring, e),
        };
        let path = acquired.path;
        let password = acquired.password;
        info!(path = %path.display(), "asset acquired");

        info!(stage = %Stage::Decrypting, path = %path.display(), "decrypting asset");
        if let Err(e) = vault::decrypt_in_place(&path, &password) {
            // The asset is still encrypted; nothing further may run.
            return fail(Stage::Decrypting, e);
        }

        info!(stage = %Stage::Processing, path = %path.display(), "processing asset");
        let processed = self.process(&path, target_language);
        if let Err(ref e) = processed {
            warn!(error = %e, "processing failed; continuing to re-encryption");
        }

        // Unconditional once decryption succeeded: confidentiality of the
        // asset comes back even when processing blew up.
        info!(stage = %Stage::ReEncrypting, path = %path.display(), "re-encrypting asset");
        if let Err(e) = vault::encrypt_in_place(&path, &password) {
            error!(
                path = %path.display(),
                error = %e,
                "re-encryption failed; ASSET LEFT UNENCRYPTED ON DISK"
            );
            return RunOutcome::Failed(PipelineFailure {
                stage: Stage::ReEncrypting,
                error: e,
                asset_left_plaintext: true,
            });
        }

        match processed {
            Ok(result) => {
                info!(path = %path.display(), language = %result.detected_language, "pipeline completed");
                RunOutcome::Completed(result)
            }
            Err(e) => fail(Stage::Processing, e),
        }
    }

    fn process(&self, path: &std::path::Path, target_language: Option<&str>) -> Result<TranscriptResult> {
        let audio = fs::read(path).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to read decrypted audio from {}", path.display()),
                e,
            )
        })?;

        let transcript = self
            .transcriber
            .transcribe(&audio)
            .map_err(|e| e.with_context("transcription failed"))?;
        info!(language = %transcript.language, chars = transcript.text.len(), "transcription complete");

        let translated_text = match target_language {
            Some(target) => {
                let translator = self.translator.ok_or_else(|| {
                    VaultError::with_kind(
                        ErrorCategory::User,
                        ErrorKind::Collaborator,
                        format!("translation to '{}' requested but no translator configured", target),
                    )
                })?;
                let translated = translator
                    .translate(&transcript.text, target)
                    .map_err(|e| e.with_context("translation failed"))?;
                info!(target = target, chars = translated.len(), "translation complete");
                Some(translated)
            }
            None => None,
        };

        Ok(TranscriptResult {
            text: transcript.text,
            detected_language: transcript.language,
            translated_text,
        })
    }
}

fn fail(stage: Stage, error: VaultError) -> RunOutcome {
    warn!(stage = %stage, error = %error, "pipeline failed");
    RunOutcome::Failed(PipelineFailure {
        stage,
        error,
        asset_left_plaintext: false,
    })
}
