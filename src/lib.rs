//! audiovault - Password-protected audio at rest, with a speech-to-text
//! pipeline that decrypts, processes, and re-encrypts assets.

#![forbid(unsafe_code)]

pub mod armor;
pub mod cipherbox;
pub mod collab;
pub mod error;
pub mod keyderive;
pub mod password;
pub mod pipeline;
pub mod source;
pub mod vault;
