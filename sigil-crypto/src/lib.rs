//! Crypto provider for Sigil.
//!
//! Provides the primitives the messaging layer sequences:
//! - X25519 + Ed25519 identity key pairs, passphrase-protected at rest
//! - Signed messages sealed for one or more recipients
//! - Argon2id password-based encryption with ChaCha20-Poly1305
//! - Text armor for keys and messages
//!
//! # Architecture
//!
//! The messaging layer only sees the [`CryptoProvider`] trait and the opaque
//! [`PublicKeyHandle`] / [`PrivateKeyHandle`] types it hands out.
//! [`NativeProvider`] implements the trait with the modules below and runs
//! every expensive operation on tokio's blocking pool.
//!
//! Algorithm choices are not global: each provider is constructed with a
//! [`ProviderConfig`] that fixes its cipher and KDF cost.

pub mod armor;
pub mod cipher;
mod config;
mod error;
pub mod key;
pub mod message;
pub mod password;
mod provider;

pub use cipher::{EncryptedData, KEY_SIZE, SALT_SIZE, SymmetricKey};
pub use config::{
    KdfParams, MAX_KDF_ITERATIONS, MAX_KDF_MEMORY_KIB, MAX_KDF_PARALLELISM, ProviderConfig,
    SymmetricCipher,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{ArmoredKeyPair, LockedPrivateKey, NativePrivateKey, NativePublicKey};
pub use provider::{CryptoProvider, NativeProvider, PrivateKeyHandle, PublicKeyHandle};
