//! Audio source acquisition
//!
//! Resolves which asset a pipeline run operates on. The three acquisition
//! intents are an explicit tagged choice made by the caller, not a menu
//! branch keyed on input characters, so there is no unreachable path.
//!
//! Whatever the intent, acquisition ends with the asset in ciphertext state
//! at a known path and the password captured exactly once.

use crate::collab::Recorder;
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::password::PasswordReader;
use crate::vault;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use zeroize::Zeroizing;

/// How to obtain the audio asset for a pipeline run.
pub enum Source<'a> {
    /// Record fresh audio via the capture collaborator, save it under a
    /// timestamped name in `dest_dir`, and encrypt it at rest.
    Capture {
        recorder: &'a mut dyn Recorder,
        dest_dir: &'a Path,
    },
    /// Use an already-encrypted file placed by the caller (e.g. an upload).
    Upload { path: PathBuf },
    /// Pick from the audio files present in `dir`, by zero-based index into
    /// the name-sorted listing.
    ExistingFile { dir: PathBuf, pick: usize },
}

/// An acquired asset: encrypted file on disk plus the password that will be
/// reused verbatim for the decrypt/re-encrypt pair of the run.
#[derive(Debug)]
pub struct Acquired {
    pub path: PathBuf,
    pub password: Zeroizing<String>,
}

impl Source<'_> {
    /// Resolve the source to an encrypted asset and a captured password.
    pub fn acquire(&mut self, password_reader: &mut dyn PasswordReader) -> Result<Acquired> {
        match self {
            Source::Capture { recorder, dest_dir } => {
                let audio = recorder
                    .record()
                    .map_err(|e| e.with_context("audio capture failed"))?;
                let path = capture_path(dest_dir);
                fs::write(&path, &audio).map_err(|e| {
                    VaultError::with_kind_and_source(
                        ErrorCategory::Internal,
                        ErrorKind::Io,
                        format!("failed to save recording to {}", path.display()),
                        e,
                    )
                })?;
                info!(path = %path.display(), bytes = audio.len(), "recording saved");

                let password = password_reader.read_password()?;
                vault::encrypt_in_place(&path, &password)?;
                Ok(Acquired { path, password })
            }
            Source::Upload { path } => {
                if !path.exists() {
                    return Err(VaultError::with_kind(
                        ErrorCategory::User,
                        ErrorKind::NoSelection,
                        format!("no file at {}", path.display()),
                    ));
                }
                let password = password_reader.read_password()?;
                Ok(Acquired {
                    path: path.clone(),
                    password,
                })
            }
            Source::ExistingFile { dir, pick } => {
                let files = list_audio_files(dir)?;
                if files.is_empty() {
                    return Err(VaultError::with_kind(
                        ErrorCategory::User,
                        ErrorKind::NoSelection,
                        format!("no audio files found in {}", dir.display()),
                    ));
                }
                let path = files.get(*pick).cloned().ok_or_else(|| {
                    VaultError::with_kind(
                        ErrorCategory::User,
                        ErrorKind::InvalidSelection,
                        format!(
                            "selection {} out of range; {} audio files available",
                            pick,
                            files.len()
                        ),
                    )
                })?;
                let password = password_reader.read_password()?;
                Ok(Acquired { path, password })
            }
        }
    }
}

/// List the audio files (by `.wav`/`.mp3` extension) in `dir`, sorted by name.
///
/// Encrypted assets keep their original extension, so the listing covers
/// both plaintext and ciphertext state files.
pub fn list_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to list {}", dir.display()),
            e,
        )
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("wav") | Some("mp3")
                )
        })
        .collect();
    files.sort();
    Ok(files)
}

fn capture_path(dir: &Path) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("audio_{}.wav", secs))
}
