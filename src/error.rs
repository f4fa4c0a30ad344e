use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example, due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Authentication failed due to an incorrect password or tampering
    /// or corruption. The two are indistinguishable on purpose.
    AuthenticationFailed,
    /// The armored representation is malformed (prefix or encoding).
    FormatInvalid,
    /// Input claimed to be audiovault data but used a future/unsupported version.
    FormatFromFuture,
    /// Base64 decoding of the armored payload failed.
    FormatDecode,
    /// Input data ended before the expected component could be read.
    TruncatedInput,
    /// Additional bytes were present after the sealed payload.
    TrailingData,
    /// The file is already in ciphertext state; encrypting it again would
    /// double-encrypt the asset.
    AlreadyEncrypted,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
    /// A transcription, translation, recording, or transcoding collaborator
    /// reported a failure.
    Collaborator,
    /// No audio file could be resolved (empty directory, user abort).
    NoSelection,
    /// The requested selection index does not refer to a listed file.
    InvalidSelection,
    /// Password could not be obtained from the configured reader.
    PasswordUnavailable,
    /// NaCl secretbox (XSalsa20Poly1305) failed to seal or open data.
    SecretboxFailure,
    /// Unexpected state reached within audiovault logic.
    InternalInvariant,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct VaultError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl VaultError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// True when the error denotes any flavor of unrecognized or malformed
    /// ciphertext format, as opposed to an authentication failure.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self.kind,
            Some(
                ErrorKind::FormatInvalid
                    | ErrorKind::FormatFromFuture
                    | ErrorKind::FormatDecode
                    | ErrorKind::TruncatedInput
                    | ErrorKind::TrailingData
                    | ErrorKind::AlreadyEncrypted
            )
        )
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VaultError>;
