//! In-place encrypted asset management
//!
//! The vault owns every state transition of an audio asset on disk. A file
//! is in exactly one of two states at any time - plaintext audio or armored
//! ciphertext - and both transitions replace the file atomically (tempfile
//! in the same directory, flush, fsync, rename), so an interrupted write
//! never leaves a half-written file behind: either the old content or the
//! new content exists at the path.

use crate::armor;
use crate::cipherbox;
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::keyderive;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// Observable on-disk state of an audio asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetState {
    Plaintext,
    Ciphertext,
}

/// Report the current state of the asset at `path` by sniffing the armor magic.
pub fn asset_state(path: &Path) -> Result<AssetState> {
    let data = fs::read(path).map_err(|e| read_error(path, e))?;
    if armor::is_armored(&data) {
        Ok(AssetState::Ciphertext)
    } else {
        Ok(AssetState::Plaintext)
    }
}

/// Encrypt the file at `path` in place
///
/// Reads the plaintext, encrypts it under the key derived from `password`,
/// and atomically replaces the file with the armored ciphertext. Refuses to
/// run on a file that is already in ciphertext state - re-encrypting an
/// encrypted asset would irreversibly stack two layers under possibly
/// different passwords.
///
/// On any failure the original file content is left untouched.
pub fn encrypt_in_place(path: &Path, password: &str) -> Result<()> {
    let plaintext = fs::read(path).map_err(|e| read_error(path, e))?;
    if armor::is_armored(&plaintext) {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::AlreadyEncrypted,
            format!("{} is already encrypted", path.display()),
        ));
    }

    let key = keyderive::derive(password);
    let ciphertext = cipherbox::encrypt(&plaintext, &key)
        .map_err(|e| e.with_context("encryption failed"))?;
    replace_file_atomic(path, ciphertext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", path.display())))?;

    info!(path = %path.display(), bytes = plaintext.len(), "asset encrypted");
    Ok(())
}

/// Decrypt the file at `path` in place
///
/// Reads the armored ciphertext, decrypts it under the key derived from
/// `password`, and atomically replaces the file with the plaintext.
///
/// A file already in plaintext state fails with a format error and is left
/// byte-for-byte unchanged; it is never silently passed through as if
/// decryption had happened. A wrong password fails with an authentication
/// error and leaves the file encrypted.
pub fn decrypt_in_place(path: &Path, password: &str) -> Result<()> {
    let blob = fs::read(path).map_err(|e| read_error(path, e))?;
    let key = keyderive::derive(password);
    let plaintext =
        cipherbox::decrypt(&blob, &key).map_err(|e| e.with_context("failed to decrypt"))?;
    replace_file_atomic(path, &plaintext)
        .map_err(|e| e.with_context(format!("failed to write to {}", path.display())))?;

    info!(path = %path.display(), bytes = plaintext.len(), "asset decrypted");
    Ok(())
}

/// Atomically replace `path` with `contents` (tempfile + fsync + rename)
///
/// The tempfile lives in the target's parent directory so the rename stays
/// on one filesystem. If anything fails before the rename, the tempfile
/// guard removes it and the original file is untouched.
fn replace_file_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| {
        VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::Io,
            "target path has no parent directory",
        )
    })?;
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to create tempfile",
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    // Persist with restrictive permissions before the rename
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = temp_file
            .as_file()
            .metadata()
            .map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to get tempfile metadata",
                    e,
                )
            })?
            .permissions();
        perms.set_mode(0o600);
        temp_file.as_file().set_permissions(perms).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                "failed to set tempfile permissions",
                e,
            )
        })?;
    }
    temp_file.persist(path).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    debug!(path = %path.display(), "atomic replace complete");
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> VaultError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    VaultError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}
