//! Authenticated encryption of audio blobs
//!
//! Seals plaintext under a derived key with NaCl secretbox
//! (XSalsa20Poly1305) and wraps the result in versioned armor. The binary
//! layout inside the armor is:
//! - nonce: 24 bytes
//! - length: 8 bytes (big-endian signed int64)
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)
//!
//! Authentication is the load-bearing property here: a wrong password or a
//! corrupted blob fails closed with a detectable error instead of yielding
//! garbage plaintext. The two causes are indistinguishable on purpose.

use crate::armor;
use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use crate::keyderive::DerivedKey;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use std::mem::size_of;

/// Length of nonce in bytes
const NONCE_LEN: usize = 24;

/// Encrypt plaintext under a derived key, returning armored ciphertext
///
/// A fresh random nonce is drawn per call, so encrypting identical plaintext
/// twice yields different ciphertext.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    encrypt_with_nonce(plaintext, key, &nonce)
}

/// Encrypt plaintext under a derived key using the provided nonce
///
/// This function is ONLY for testing purposes to generate deterministic
/// output. NEVER use this in production - always use `encrypt()` which
/// generates a random nonce.
pub fn encrypt_with_nonce(
    plaintext: &[u8],
    key: &DerivedKey,
    nonce: &[u8; NONCE_LEN],
) -> Result<String> {
    let cipher = XSalsa20Poly1305::new(key.as_bytes().into());

    let nonce_obj = Nonce::from(*nonce);
    let sealed_box = cipher.encrypt(&nonce_obj, plaintext).map_err(|e| {
        VaultError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::SecretboxFailure,
            format!("encryption failed: {}", e),
        )
    })?;

    let sealed_box_len = sealed_box.len() as i64;
    let mut body = Vec::with_capacity(NONCE_LEN + size_of::<i64>() + sealed_box.len());
    body.extend_from_slice(nonce);
    body.extend_from_slice(&sealed_box_len.to_be_bytes()); // big-endian i64
    body.extend_from_slice(&sealed_box);

    Ok(armor::wrap(&body))
}

/// Decrypt an armored ciphertext blob under a derived key
///
/// Fails with an authentication error when the integrity tag does not verify
/// (wrong password or tampered/corrupted data), and with a format error when
/// the blob is not recognized as audiovault ciphertext at all (for example,
/// plaintext audio mistakenly passed in).
pub fn decrypt(blob: &[u8], key: &DerivedKey) -> Result<Vec<u8>> {
    let armored = std::str::from_utf8(blob).map_err(|e| {
        VaultError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::FormatInvalid,
            "input is not armored ciphertext (not valid UTF-8)",
            e,
        )
    })?;
    let ciphertext = armor::unwrap(armored)?;

    let mut pos = 0;

    if ciphertext.len() < pos + NONCE_LEN {
        return Err(truncated("input likely truncated while reading nonce"));
    }
    let nonce: [u8; NONCE_LEN] = ciphertext[pos..pos + NONCE_LEN]
        .try_into()
        .map_err(|_| truncated("failed to read nonce"))?;
    pos += NONCE_LEN;

    if ciphertext.len() < pos + size_of::<i64>() {
        return Err(truncated("input likely truncated while reading sealed box"));
    }
    let length_bytes: [u8; 8] = ciphertext[pos..pos + size_of::<i64>()]
        .try_into()
        .map_err(|_| truncated("failed to read length"))?;
    let sealed_box_len = i64::from_be_bytes(length_bytes);
    pos += size_of::<i64>();

    if sealed_box_len < 0 {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatInvalid,
            "negative sealed box length (when interpreted as a big-endian i64)",
        ));
    }

    // Check if length exceeds platform's maximum isize. *Valid* input
    // can fail this check if the platform's isize is small.
    if sealed_box_len > isize::MAX as i64 {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::FormatInvalid,
            "sealed box length exceeds this system's max isize",
        ));
    }

    let sealed_box_len = sealed_box_len as usize;

    if sealed_box_len > ciphertext.len() {
        return Err(truncated(
            "truncated or corrupt input; claimed length greater than available input",
        ));
    }

    if ciphertext.len() < pos + sealed_box_len {
        return Err(truncated(
            "truncated or corrupt input (while reading sealed box)",
        ));
    }
    let sealed_box = &ciphertext[pos..pos + sealed_box_len];
    pos += sealed_box_len;

    if pos < ciphertext.len() {
        return Err(VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::TrailingData,
            "invalid input: unexpected data after sealed box",
        ));
    }

    let cipher = XSalsa20Poly1305::new(key.as_bytes().into());
    let nonce_obj = Nonce::from(nonce);
    let plaintext = cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
        VaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "corrupt input, tampered-with data, or bad password",
        )
    })?;

    Ok(plaintext)
}

fn truncated(msg: &str) -> VaultError {
    VaultError::with_kind(ErrorCategory::User, ErrorKind::TruncatedInput, msg)
}
