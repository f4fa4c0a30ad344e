//! Versioned armoring for ciphertext at rest
//!
//! Provides base64url encoding with a version prefix for encrypted data.
//! The armored format is:
//! - Free of whitespace (including newlines)
//! - Safe to embed in URLs
//! - Safe to pass unescaped in a POSIX shell
//!
//! The magic prefix doubles as the asset-state discriminator: a file whose
//! contents start with it is in ciphertext state, anything else is plaintext.

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

/// Magic prefix for all audiovault versions
const MAGIC_PREFIX: &str = "audiovault";

/// Version 1 magic marker
const V1_MAGIC: &str = "audiovault1:";

/// Wrap bytes in armor, returning the armored string
///
/// Format: audiovault1:{base64url-no-padding}
pub fn wrap(body: &[u8]) -> String {
    let encoded = URL_SAFE_NO_PAD.encode(body);
    format!("{}{}", V1_MAGIC, encoded)
}

/// True if the bytes begin with the magic marker of any known version.
pub fn is_armored(data: &[u8]) -> bool {
    data.starts_with(MAGIC_PREFIX.as_bytes())
}

/// Unwrap an armored string, returning the original bytes
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    if armored.len() < V1_MAGIC.len() {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatInvalid,
            "input size smaller than magic marker; likely truncated",
        ));
    }

    if let Some(encoded) = armored.strip_prefix(V1_MAGIC) {
        let body = URL_SAFE_NO_PAD.decode(encoded).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::FormatDecode,
                format!("base64 decoding failed: {}", e),
                e,
            )
        })?;
        Ok(body)
    } else if armored.starts_with(MAGIC_PREFIX) {
        Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatFromFuture,
            "input claims to be audiovault, but not a version we support",
        ))
    } else {
        Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatInvalid,
            "input unrecognized as audiovault data",
        ))
    }
}
