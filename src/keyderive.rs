//! Deterministic password-to-key derivation
//!
//! The key is the UTF-8 encoding of the password, right-padded with spaces
//! to 32 bytes or cut at byte 32. This mirrors the derivation used by every
//! previously encrypted asset, so it must stay byte-for-byte stable: assets
//! encrypted under older releases would otherwise become unreadable.
//!
//! Known weakness: the derivation is unsalted and fast, so equal passwords
//! always produce equal keys and brute force is not slowed down. Do not
//! "fix" this by switching to a salted slow KDF; that is a compatibility
//! break, not a patch.

use zeroize::Zeroizing;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Filler byte appended to passwords shorter than [`KEY_LEN`]
const PAD_BYTE: u8 = b' ';

/// A 32-byte symmetric key derived from a password.
///
/// Wipes itself from memory on drop.
pub struct DerivedKey(Zeroizing<[u8; KEY_LEN]>);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Derive a key from a password.
///
/// Pure and infallible: no I/O, no randomness, any string (including the
/// empty string) yields a key. Normalization operates on raw UTF-8 code
/// units; truncation at byte 32 may split a multi-byte character, which is
/// fine because the result is only ever used as key material.
pub fn derive(password: &str) -> DerivedKey {
    let mut key = Zeroizing::new([PAD_BYTE; KEY_LEN]);
    let bytes = password.as_bytes();
    let n = bytes.len().min(KEY_LEN);
    key[..n].copy_from_slice(&bytes[..n]);
    DerivedKey(key)
}
