//! Authenticated symmetric encryption and Argon2id key derivation.

use crate::config::{KdfParams, SymmetricCipher};
use crate::error::{CryptoError, CryptoResult};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of every symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of Argon2id salts in bytes.
pub const SALT_SIZE: usize = 16;

/// A 256-bit symmetric key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// AEAD ciphertext together with the cipher and nonce that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedData {
    pub cipher: SymmetricCipher,
    pub nonce: Vec<u8>,
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` under `key`, authenticating `aad` alongside it.
pub fn encrypt(
    cipher: SymmetricCipher,
    key: &SymmetricKey,
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<EncryptedData> {
    let mut nonce = vec![0u8; cipher.nonce_len()];
    OsRng.fill_bytes(&mut nonce);

    let payload = Payload {
        msg: plaintext,
        aad,
    };
    let key = Key::from_slice(key.as_bytes());
    let ciphertext = match cipher {
        SymmetricCipher::ChaCha20Poly1305 => {
            ChaCha20Poly1305::new(key).encrypt(Nonce::from_slice(&nonce), payload)
        }
        SymmetricCipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key).encrypt(XNonce::from_slice(&nonce), payload)
        }
    }
    .map_err(|e| CryptoError::Encryption(format!("{cipher:?} seal failed: {e}")))?;

    Ok(EncryptedData {
        cipher,
        nonce,
        ciphertext,
    })
}

/// Decrypts and authenticates `data`. Any mismatch in key, nonce, aad or
/// ciphertext yields [`CryptoError::Decryption`].
pub fn decrypt(
    key: &SymmetricKey,
    data: &EncryptedData,
    aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if data.nonce.len() != data.cipher.nonce_len() {
        return Err(CryptoError::Decryption(format!(
            "invalid nonce length {} for {:?}",
            data.nonce.len(),
            data.cipher
        )));
    }

    let payload = Payload {
        msg: &data.ciphertext,
        aad,
    };
    let key = Key::from_slice(key.as_bytes());
    let plaintext = match data.cipher {
        SymmetricCipher::ChaCha20Poly1305 => {
            ChaCha20Poly1305::new(key).decrypt(Nonce::from_slice(&data.nonce), payload)
        }
        SymmetricCipher::XChaCha20Poly1305 => {
            XChaCha20Poly1305::new(key).decrypt(XNonce::from_slice(&data.nonce), payload)
        }
    }
    .map_err(|_| CryptoError::Decryption("wrong key or tampered data".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Derives a symmetric key from a password with Argon2id.
///
/// `params` is used as given; callers holding parameters read from a key or
/// message check them with [`KdfParams::check_limits`] first.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<SymmetricKey, argon2::Error> {
    let argon_params = argon2::Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )?;
    let argon = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut out = [0u8; KEY_SIZE];
    argon.hash_password_into(password, salt, &mut out)?;
    let key = SymmetricKey::from_bytes(out);
    out.zeroize();
    Ok(key)
}

/// Fresh random salt.
pub fn random_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}
