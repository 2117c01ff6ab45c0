//! Crypto provider error types.

use thiserror::Error;

/// Result type for crypto provider operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur inside the crypto provider.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("key parsing failed: {0}")]
    KeyParse(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("session key derivation failed: {0}")]
    Derivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("crypto worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for CryptoError {
    fn from(err: tokio::task::JoinError) -> Self {
        CryptoError::Worker(err.to_string())
    }
}
