//! Provider configuration.
//!
//! Passed once to [`NativeProvider::new`](crate::NativeProvider::new). There
//! is no process-wide default algorithm: every provider instance carries its
//! own cipher choice and KDF cost.

use serde::{Deserialize, Serialize};

/// AEAD used for bulk data, wrapped session keys, and private keys at rest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymmetricCipher {
    #[default]
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
    #[serde(rename = "xchacha20-poly1305")]
    XChaCha20Poly1305,
}

impl SymmetricCipher {
    /// Key length in bytes.
    pub fn key_len(self) -> usize {
        match self {
            SymmetricCipher::ChaCha20Poly1305 | SymmetricCipher::XChaCha20Poly1305 => 32,
        }
    }

    /// Nonce length in bytes.
    pub fn nonce_len(self) -> usize {
        match self {
            SymmetricCipher::ChaCha20Poly1305 => 12,
            SymmetricCipher::XChaCha20Poly1305 => 24,
        }
    }
}

/// Largest memory cost accepted from a key or message (1 GiB).
pub const MAX_KDF_MEMORY_KIB: u32 = 1024 * 1024;
/// Largest pass count accepted from a key or message.
pub const MAX_KDF_ITERATIONS: u32 = 16;
/// Largest lane count accepted from a key or message.
pub const MAX_KDF_PARALLELISM: u32 = 8;

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // OWASP minimum recommendation for Argon2id
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl KdfParams {
    /// Smallest parameters Argon2 accepts. Only for tests and constrained devices.
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Checks the parameters against the limits applied to anything read
    /// back from a key or message.
    pub fn check_limits(&self) -> Result<(), String> {
        if self.memory_kib > MAX_KDF_MEMORY_KIB {
            return Err(format!(
                "memory cost {} KiB exceeds {MAX_KDF_MEMORY_KIB} KiB",
                self.memory_kib
            ));
        }
        if self.iterations > MAX_KDF_ITERATIONS {
            return Err(format!(
                "{} iterations exceed {MAX_KDF_ITERATIONS}",
                self.iterations
            ));
        }
        if self.parallelism > MAX_KDF_PARALLELISM {
            return Err(format!(
                "parallelism {} exceeds {MAX_KDF_PARALLELISM}",
                self.parallelism
            ));
        }
        Ok(())
    }
}

/// Configuration for a [`NativeProvider`](crate::NativeProvider).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Cipher for everything this provider encrypts. Decryption follows
    /// whatever cipher the message or key records.
    pub cipher: SymmetricCipher,

    /// Argon2id cost for passphrase-protected keys and password encryption.
    pub kdf: KdfParams,
}

impl ProviderConfig {
    /// Configuration with the cheapest KDF parameters.
    pub fn low_cost() -> Self {
        Self {
            cipher: SymmetricCipher::default(),
            kdf: KdfParams::low_cost(),
        }
    }
}
