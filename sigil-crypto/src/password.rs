//! Password-based encryption (Argon2id -> AEAD).
//!
//! The salt and KDF parameters travel with the ciphertext, so the password is
//! the only input needed for decryption.

use crate::armor::{ArmorKind, armor, dearmor};
use crate::cipher::{self, EncryptedData, SALT_SIZE};
use crate::config::{KdfParams, ProviderConfig};
use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};

const PASSWORD_FORMAT_VERSION: u8 = 1;
const AAD_CONTEXT: &[u8] = b"sigil-symmetric-message-v1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PasswordPacket {
    version: u8,
    kdf: KdfParams,
    salt: [u8; SALT_SIZE],
    data: EncryptedData,
}

fn aad(salt: &[u8; SALT_SIZE]) -> Vec<u8> {
    [AAD_CONTEXT, salt.as_slice()].concat()
}

/// Encrypts `plaintext` under a key derived from `password`.
pub fn encrypt(config: &ProviderConfig, password: &str, plaintext: &str) -> CryptoResult<String> {
    if password.is_empty() {
        return Err(CryptoError::Encryption("password must not be empty".into()));
    }
    config.kdf.check_limits().map_err(CryptoError::Encryption)?;

    let salt = cipher::random_salt();
    let key = cipher::derive_key(password.as_bytes(), &salt, &config.kdf)
        .map_err(|e| CryptoError::Encryption(format!("password derivation: {e}")))?;
    let data = cipher::encrypt(config.cipher, &key, plaintext.as_bytes(), &aad(&salt))?;

    let packet = PasswordPacket {
        version: PASSWORD_FORMAT_VERSION,
        kdf: config.kdf,
        salt,
        data,
    };
    let bytes = serde_json::to_vec(&packet)
        .map_err(|e| CryptoError::Encryption(format!("serialize message: {e}")))?;
    Ok(armor(ArmorKind::SymmetricMessage, &bytes))
}

/// Decrypts a password-encrypted message.
pub fn decrypt(password: &str, armored: &str) -> CryptoResult<String> {
    let bytes = dearmor(ArmorKind::SymmetricMessage, armored)
        .map_err(|e| CryptoError::Decryption(format!("malformed message: {e}")))?;
    let packet: PasswordPacket = serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::Decryption(format!("malformed message: {e}")))?;
    if packet.version != PASSWORD_FORMAT_VERSION {
        return Err(CryptoError::Decryption(format!(
            "unsupported message version {}",
            packet.version
        )));
    }

    packet.kdf.check_limits().map_err(CryptoError::Decryption)?;
    let key = cipher::derive_key(password.as_bytes(), &packet.salt, &packet.kdf)
        .map_err(|e| CryptoError::Decryption(format!("invalid key derivation parameters: {e}")))?;
    let plaintext = cipher::decrypt(&key, &packet.data, &aad(&packet.salt))?;

    String::from_utf8(plaintext.to_vec())
        .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SymmetricCipher;

    #[test]
    fn roundtrip() {
        let config = ProviderConfig::low_cost();
        let armored = encrypt(&config, "session-key", "bulk payload").unwrap();
        assert!(armored.starts_with("-----BEGIN SIGIL SYMMETRIC MESSAGE-----"));
        assert_eq!(decrypt("session-key", &armored).unwrap(), "bulk payload");
    }

    #[test]
    fn wrong_password_fails() {
        let config = ProviderConfig::low_cost();
        let armored = encrypt(&config, "session-key", "bulk payload").unwrap();
        assert!(matches!(
            decrypt("other-key", &armored),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn decrypt_follows_recorded_cipher() {
        let config = ProviderConfig {
            cipher: SymmetricCipher::XChaCha20Poly1305,
            kdf: KdfParams::low_cost(),
        };
        let armored = encrypt(&config, "pw", "data").unwrap();
        assert_eq!(decrypt("pw", &armored).unwrap(), "data");
    }

    #[test]
    fn empty_password_rejected() {
        assert!(matches!(
            encrypt(&ProviderConfig::low_cost(), "", "data"),
            Err(CryptoError::Encryption(_))
        ));
    }

    #[test]
    fn forged_kdf_cost_is_rejected_before_derivation() {
        let armored = encrypt(&ProviderConfig::low_cost(), "pw", "data").unwrap();
        let bytes = dearmor(ArmorKind::SymmetricMessage, &armored).unwrap();
        let mut packet: PasswordPacket = serde_json::from_slice(&bytes).unwrap();
        packet.kdf.iterations = u32::MAX;
        let forged = armor(
            ArmorKind::SymmetricMessage,
            &serde_json::to_vec(&packet).unwrap(),
        );

        match decrypt("pw", &forged) {
            Err(CryptoError::Decryption(msg)) => assert!(msg.contains("iterations"), "{msg}"),
            other => panic!("expected Decryption, got {other:?}"),
        }
    }

    #[test]
    fn oversized_config_is_refused_at_encryption() {
        let config = ProviderConfig {
            cipher: SymmetricCipher::default(),
            kdf: KdfParams {
                parallelism: 64,
                ..KdfParams::low_cost()
            },
        };
        assert!(matches!(
            encrypt(&config, "pw", "data"),
            Err(CryptoError::Encryption(_))
        ));
    }

    #[test]
    fn asymmetric_armor_is_not_accepted() {
        let other = armor(ArmorKind::Message, b"{}");
        assert!(matches!(
            decrypt("pw", &other),
            Err(CryptoError::Decryption(_))
        ));
    }
}
