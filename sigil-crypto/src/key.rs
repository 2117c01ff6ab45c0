//! Identity key pairs.
//!
//! A key pair combines an X25519 key (crypto_box) used to receive wrapped
//! session keys with an Ed25519 key used to sign them. The public half is
//! exported as an armored `PUBLIC KEY` block; the private half is exported as
//! an armored `PRIVATE KEY` block whose secret material is encrypted with an
//! Argon2id-derived key (ChaCha20-Poly1305 or XChaCha20-Poly1305).

use crate::armor::{ArmorKind, armor, dearmor};
use crate::cipher::{self, EncryptedData, SALT_SIZE};
use crate::config::{KdfParams, ProviderConfig, SymmetricCipher};
use crate::error::{CryptoError, CryptoResult};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const KEY_FORMAT_VERSION: u8 = 1;
const SELF_SIGNATURE_CONTEXT: &[u8] = b"sigil-key-self-signature-v1";

/// Fingerprint length in bytes (hex encoded it is twice as long).
pub const FINGERPRINT_LEN: usize = 20;

/// Armored key pair as returned by key generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmoredKeyPair {
    /// Passphrase-protected private key.
    pub private_key: String,
    pub public_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PublicKeyPacket {
    version: u8,
    user_id: String,
    created_at: i64,
    /// Cipher the key owner prefers for data addressed to them.
    preferred_cipher: SymmetricCipher,
    encryption_key: [u8; 32],
    signing_key: [u8; 32],
}

/// Public packet plus an Ed25519 signature over it by its own signing key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignedPublicKey {
    packet: PublicKeyPacket,
    self_signature: Vec<u8>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrivateKeyPacket {
    version: u8,
    public: SignedPublicKey,
    kdf: KdfParams,
    salt: [u8; SALT_SIZE],
    secret: EncryptedData,
}

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
struct SecretMaterial {
    encryption_secret: [u8; 32],
    signing_secret: [u8; 32],
}

fn packet_bytes(packet: &PublicKeyPacket) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = SELF_SIGNATURE_CONTEXT.to_vec();
    bytes.extend(serde_json::to_vec(packet)?);
    Ok(bytes)
}

fn fingerprint_of(encryption_key: &[u8; 32], signing_key: &[u8; 32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"sigil-fingerprint-v1");
    hasher.update(encryption_key);
    hasher.update(signing_key);
    hex::encode(&hasher.finalize()[..FINGERPRINT_LEN])
}

// ============================================================================
// Handles
// ============================================================================

struct PublicInner {
    packet: PublicKeyPacket,
    encryption: crypto_box::PublicKey,
    verifying: VerifyingKey,
    fingerprint: String,
}

/// Parsed public key. Cheap to clone.
#[derive(Clone)]
pub struct NativePublicKey(Arc<PublicInner>);

impl NativePublicKey {
    fn from_signed(signed: SignedPublicKey) -> CryptoResult<Self> {
        let SignedPublicKey {
            packet,
            self_signature,
        } = signed;
        if packet.version != KEY_FORMAT_VERSION {
            return Err(CryptoError::KeyParse(format!(
                "unsupported key version {}",
                packet.version
            )));
        }
        let verifying = VerifyingKey::from_bytes(&packet.signing_key)
            .map_err(|e| CryptoError::KeyParse(format!("invalid signing key: {e}")))?;

        let signature = Signature::from_slice(&self_signature)
            .map_err(|e| CryptoError::KeyParse(format!("malformed self-signature: {e}")))?;
        let signed_bytes = packet_bytes(&packet)
            .map_err(|e| CryptoError::KeyParse(format!("serialize public key: {e}")))?;
        verifying
            .verify_strict(&signed_bytes, &signature)
            .map_err(|_| CryptoError::KeyParse("self-signature does not verify".into()))?;
        let encryption = crypto_box::PublicKey::from(packet.encryption_key);
        let fingerprint = fingerprint_of(&packet.encryption_key, &packet.signing_key);

        Ok(Self(Arc::new(PublicInner {
            packet,
            encryption,
            verifying,
            fingerprint,
        })))
    }

    pub fn fingerprint(&self) -> &str {
        &self.0.fingerprint
    }

    pub fn user_id(&self) -> &str {
        &self.0.packet.user_id
    }

    /// Unix timestamp of key creation.
    pub fn created_at(&self) -> i64 {
        self.0.packet.created_at
    }

    pub fn preferred_cipher(&self) -> SymmetricCipher {
        self.0.packet.preferred_cipher
    }

    pub(crate) fn encryption_key(&self) -> &crypto_box::PublicKey {
        &self.0.encryption
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.0.verifying
    }
}

impl fmt::Debug for NativePublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePublicKey")
            .field("user_id", &self.user_id())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

struct PrivateInner {
    public: NativePublicKey,
    encryption: crypto_box::SecretKey,
    signing: SigningKey,
}

/// Unlocked private key. Secret material is zeroized when the last clone drops.
#[derive(Clone)]
pub struct NativePrivateKey(Arc<PrivateInner>);

impl NativePrivateKey {
    pub fn fingerprint(&self) -> &str {
        self.0.public.fingerprint()
    }

    /// The public half of this key.
    pub fn public_key(&self) -> &NativePublicKey {
        &self.0.public
    }

    pub(crate) fn encryption_secret(&self) -> &crypto_box::SecretKey {
        &self.0.encryption
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.0.signing
    }
}

impl fmt::Debug for NativePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativePrivateKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Parsed private key that still needs its passphrase.
#[derive(Clone)]
pub struct LockedPrivateKey {
    packet: PrivateKeyPacket,
    public: NativePublicKey,
}

impl LockedPrivateKey {
    pub fn fingerprint(&self) -> &str {
        self.public.fingerprint()
    }
}

impl fmt::Debug for LockedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedPrivateKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Generates a fresh key pair and protects the private half with `passphrase`.
pub fn generate_key_pair(
    config: &ProviderConfig,
    passphrase: &str,
    user_id: &str,
) -> CryptoResult<ArmoredKeyPair> {
    if user_id.trim().is_empty() {
        return Err(CryptoError::KeyGeneration("user id must not be empty".into()));
    }
    if passphrase.is_empty() {
        return Err(CryptoError::KeyGeneration(
            "passphrase must not be empty".into(),
        ));
    }
    config.kdf.check_limits().map_err(CryptoError::KeyGeneration)?;

    let encryption = crypto_box::SecretKey::generate(&mut OsRng);
    let signing = SigningKey::generate(&mut OsRng);

    let public = PublicKeyPacket {
        version: KEY_FORMAT_VERSION,
        user_id: user_id.to_string(),
        created_at: chrono::Utc::now().timestamp(),
        preferred_cipher: config.cipher,
        encryption_key: *encryption.public_key().as_bytes(),
        signing_key: signing.verifying_key().to_bytes(),
    };
    let public_bytes = packet_bytes(&public)
        .map_err(|e| CryptoError::KeyGeneration(format!("serialize public key: {e}")))?;
    let public = SignedPublicKey {
        self_signature: signing.sign(&public_bytes).to_bytes().to_vec(),
        packet: public,
    };

    let material = SecretMaterial {
        encryption_secret: encryption.to_bytes(),
        signing_secret: signing.to_bytes(),
    };
    let material_bytes = Zeroizing::new(
        serde_json::to_vec(&material)
            .map_err(|e| CryptoError::KeyGeneration(format!("serialize secret: {e}")))?,
    );

    let salt = cipher::random_salt();
    let wrapping_key = cipher::derive_key(passphrase.as_bytes(), &salt, &config.kdf)
        .map_err(|e| CryptoError::KeyGeneration(format!("passphrase derivation: {e}")))?;
    // The public packet is authenticated so secret material cannot be
    // transplanted under a different public key.
    let secret = cipher::encrypt(config.cipher, &wrapping_key, &material_bytes, &public_bytes)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

    let private = PrivateKeyPacket {
        version: KEY_FORMAT_VERSION,
        public: public.clone(),
        kdf: config.kdf,
        salt,
        secret,
    };

    let public_armor_bytes = serde_json::to_vec(&public)
        .map_err(|e| CryptoError::KeyGeneration(format!("serialize public key: {e}")))?;
    let private_bytes = serde_json::to_vec(&private)
        .map_err(|e| CryptoError::KeyGeneration(format!("serialize private key: {e}")))?;

    Ok(ArmoredKeyPair {
        private_key: armor(ArmorKind::PrivateKey, &private_bytes),
        public_key: armor(ArmorKind::PublicKey, &public_armor_bytes),
    })
}

/// Parses an armored public key.
pub fn read_public_key(armored: &str) -> CryptoResult<NativePublicKey> {
    let bytes = dearmor(ArmorKind::PublicKey, armored)
        .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
    let signed: SignedPublicKey = serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::KeyParse(format!("malformed public key: {e}")))?;
    NativePublicKey::from_signed(signed)
}

/// Parses an armored private key without unlocking it.
pub fn read_private_key(armored: &str) -> CryptoResult<LockedPrivateKey> {
    let bytes = dearmor(ArmorKind::PrivateKey, armored)
        .map_err(|e| CryptoError::KeyParse(e.to_string()))?;
    let packet: PrivateKeyPacket = serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::KeyParse(format!("malformed private key: {e}")))?;
    if packet.version != KEY_FORMAT_VERSION {
        return Err(CryptoError::KeyParse(format!(
            "unsupported key version {}",
            packet.version
        )));
    }
    packet
        .kdf
        .check_limits()
        .map_err(|e| CryptoError::KeyParse(format!("private key KDF parameters: {e}")))?;
    let public = NativePublicKey::from_signed(packet.public.clone())?;
    Ok(LockedPrivateKey { packet, public })
}

/// Unlocks a private key with its passphrase.
pub fn decrypt_private_key(
    locked: &LockedPrivateKey,
    passphrase: &str,
) -> CryptoResult<NativePrivateKey> {
    let packet = &locked.packet;
    let wrapping_key = cipher::derive_key(passphrase.as_bytes(), &packet.salt, &packet.kdf)
        .map_err(|e| CryptoError::KeyParse(format!("invalid key derivation parameters: {e}")))?;

    let public_bytes = packet_bytes(&packet.public.packet)
        .map_err(|e| CryptoError::KeyParse(format!("serialize public key: {e}")))?;
    let material_bytes = cipher::decrypt(&wrapping_key, &packet.secret, &public_bytes)
        .map_err(|_| CryptoError::Authentication("incorrect passphrase for private key".into()))?;

    let material: SecretMaterial = serde_json::from_slice(&material_bytes)
        .map_err(|e| CryptoError::KeyParse(format!("malformed secret material: {e}")))?;

    let encryption = crypto_box::SecretKey::from(material.encryption_secret);
    let signing = SigningKey::from_bytes(&material.signing_secret);

    if encryption.public_key().as_bytes() != locked.public.encryption_key().as_bytes()
        || signing.verifying_key() != *locked.public.verifying_key()
    {
        return Err(CryptoError::KeyParse(
            "secret material does not match its public key".into(),
        ));
    }

    Ok(NativePrivateKey(Arc::new(PrivateInner {
        public: locked.public.clone(),
        encryption,
        signing,
    })))
}
