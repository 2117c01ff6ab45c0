//! Messaging error types.
//!
//! Every public operation reports failures as a [`MessagingError`] tagged
//! with the [`Operation`] that produced it.

use sigil_crypto::CryptoError;
use std::fmt;
use thiserror::Error;

/// Result type for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Public operations of an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Build,
    Load,
    ExportMasterKeys,
    Encrypt,
    Decrypt,
    Share,
    ShareNew,
    Receive,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Build => "build",
            Operation::Load => "load",
            Operation::ExportMasterKeys => "export_master_keys",
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
            Operation::Share => "share",
            Operation::ShareNew => "share_new",
            Operation::Receive => "receive",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong, independent of the operation.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("identity keys are not loaded")]
    NotReady,

    #[error("identity keys are already loaded")]
    AlreadyLoaded,

    #[error("malformed envelope: {0}")]
    EnvelopeFormat(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// A failed messaging operation.
#[derive(Debug, Error)]
#[error("{operation} failed: {kind}")]
pub struct MessagingError {
    pub operation: Operation,
    #[source]
    pub kind: ErrorKind,
}

impl MessagingError {
    pub fn new(operation: Operation, kind: impl Into<ErrorKind>) -> Self {
        Self {
            operation,
            kind: kind.into(),
        }
    }

    /// The underlying crypto failure, if there is one.
    pub fn crypto(&self) -> Option<&CryptoError> {
        match &self.kind {
            ErrorKind::Crypto(err) => Some(err),
            _ => None,
        }
    }

    /// Wrong passphrase or untrusted signature. Retrying with the same
    /// credentials cannot succeed and should not be attempted.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self.crypto(),
            Some(CryptoError::Authentication(_) | CryptoError::SignatureVerification(_))
        )
    }
}

/// Tags a failure with the operation it happened in.
pub(crate) trait During<T> {
    fn during(self, operation: Operation) -> MessagingResult<T>;
}

impl<T, E: Into<ErrorKind>> During<T> for Result<T, E> {
    fn during(self, operation: Operation) -> MessagingResult<T> {
        self.map_err(|err| MessagingError::new(operation, err))
    }
}
