//! The crypto provider seam.
//!
//! [`CryptoProvider`] is everything the messaging layer needs from
//! cryptography. Keys cross the seam only as opaque handles, so an
//! implementation can use any native key representation behind them.
//! [`NativeProvider`] is the implementation shipped with this crate.

use crate::config::ProviderConfig;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{self, ArmoredKeyPair, LockedPrivateKey, NativePrivateKey, NativePublicKey};
use crate::{message, password};
use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt::Debug;
use std::sync::Arc;
use zeroize::Zeroizing;

/// A parsed public key.
pub trait PublicKeyHandle: Clone + Debug + Send + Sync + 'static {
    /// Stable hex fingerprint identifying the key.
    fn fingerprint(&self) -> &str;

    /// User id the key was generated for.
    fn user_id(&self) -> &str;
}

/// An unlocked, usable private key.
pub trait PrivateKeyHandle: Clone + Debug + Send + Sync + 'static {
    /// Fingerprint of the matching public key.
    fn fingerprint(&self) -> &str;
}

/// Cryptographic operations consumed by the messaging layer.
///
/// All operations are async; implementations are expected to move CPU-heavy
/// work off the calling task.
#[async_trait]
pub trait CryptoProvider: Send + Sync + 'static {
    type PublicKey: PublicKeyHandle;
    type PrivateKey: PrivateKeyHandle;
    /// A parsed private key that still needs its passphrase.
    type LockedPrivateKey: Send + Sync + 'static;

    /// Generates a key pair for `user_id`, protected with `passphrase`.
    async fn generate_key_pair(
        &self,
        passphrase: &str,
        user_id: &str,
    ) -> CryptoResult<ArmoredKeyPair>;

    /// Derives a fresh hex session key suited to `public_key`.
    async fn generate_session_key(&self, public_key: &Self::PublicKey) -> CryptoResult<String>;

    async fn read_public_key(&self, armored: &str) -> CryptoResult<Self::PublicKey>;

    async fn read_private_key(&self, armored: &str) -> CryptoResult<Self::LockedPrivateKey>;

    /// Unlocks a private key. Fails with [`CryptoError::Authentication`] on a
    /// wrong passphrase.
    async fn decrypt_private_key(
        &self,
        locked: Self::LockedPrivateKey,
        passphrase: &str,
    ) -> CryptoResult<Self::PrivateKey>;

    /// Encrypts `plaintext` for `recipients`, signed by `signer` if given.
    async fn encrypt_asymmetric(
        &self,
        signer: Option<&Self::PrivateKey>,
        recipients: &[Self::PublicKey],
        plaintext: &str,
    ) -> CryptoResult<String>;

    /// Decrypts with `decryptor`, accepting only signatures from
    /// `verification_keys`.
    async fn decrypt_asymmetric(
        &self,
        decryptor: &Self::PrivateKey,
        verification_keys: &[Self::PublicKey],
        ciphertext: &str,
        expect_signed: bool,
    ) -> CryptoResult<String>;

    async fn encrypt_symmetric(&self, password: &str, plaintext: &str) -> CryptoResult<String>;

    async fn decrypt_symmetric(&self, password: &str, ciphertext: &str) -> CryptoResult<String>;
}

impl PublicKeyHandle for NativePublicKey {
    fn fingerprint(&self) -> &str {
        NativePublicKey::fingerprint(self)
    }

    fn user_id(&self) -> &str {
        NativePublicKey::user_id(self)
    }
}

impl PrivateKeyHandle for NativePrivateKey {
    fn fingerprint(&self) -> &str {
        NativePrivateKey::fingerprint(self)
    }
}

/// X25519 / Ed25519 / Argon2id / ChaCha20-Poly1305 provider.
#[derive(Clone, Debug, Default)]
pub struct NativeProvider {
    config: Arc<ProviderConfig>,
}

impl NativeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Runs CPU-bound work on the blocking pool.
async fn offload<T, F>(work: F) -> CryptoResult<T>
where
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

#[async_trait]
impl CryptoProvider for NativeProvider {
    type PublicKey = NativePublicKey;
    type PrivateKey = NativePrivateKey;
    type LockedPrivateKey = LockedPrivateKey;

    async fn generate_key_pair(
        &self,
        passphrase: &str,
        user_id: &str,
    ) -> CryptoResult<ArmoredKeyPair> {
        let config = Arc::clone(&self.config);
        let passphrase = Zeroizing::new(passphrase.to_string());
        let user_id = user_id.to_string();
        offload(move || key::generate_key_pair(&config, &passphrase, &user_id)).await
    }

    async fn generate_session_key(&self, public_key: &NativePublicKey) -> CryptoResult<String> {
        let mut bytes = Zeroizing::new(vec![0u8; public_key.preferred_cipher().key_len()]);
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Derivation(format!("OS randomness unavailable: {e}")))?;
        Ok(hex::encode(bytes.as_slice()))
    }

    async fn read_public_key(&self, armored: &str) -> CryptoResult<NativePublicKey> {
        key::read_public_key(armored)
    }

    async fn read_private_key(&self, armored: &str) -> CryptoResult<LockedPrivateKey> {
        key::read_private_key(armored)
    }

    async fn decrypt_private_key(
        &self,
        locked: LockedPrivateKey,
        passphrase: &str,
    ) -> CryptoResult<NativePrivateKey> {
        let passphrase = Zeroizing::new(passphrase.to_string());
        offload(move || key::decrypt_private_key(&locked, &passphrase)).await
    }

    async fn encrypt_asymmetric(
        &self,
        signer: Option<&NativePrivateKey>,
        recipients: &[NativePublicKey],
        plaintext: &str,
    ) -> CryptoResult<String> {
        let cipher = self.config.cipher;
        let signer = signer.cloned();
        let recipients = recipients.to_vec();
        let plaintext = Zeroizing::new(plaintext.to_string());
        offload(move || message::encrypt(cipher, signer.as_ref(), &recipients, &plaintext)).await
    }

    async fn decrypt_asymmetric(
        &self,
        decryptor: &NativePrivateKey,
        verification_keys: &[NativePublicKey],
        ciphertext: &str,
        expect_signed: bool,
    ) -> CryptoResult<String> {
        let decryptor = decryptor.clone();
        let verification_keys = verification_keys.to_vec();
        let ciphertext = ciphertext.to_string();
        offload(move || {
            message::decrypt(&decryptor, &verification_keys, &ciphertext, expect_signed)
        })
        .await
    }

    async fn encrypt_symmetric(&self, password: &str, plaintext: &str) -> CryptoResult<String> {
        let config = Arc::clone(&self.config);
        let secret = Zeroizing::new(password.to_string());
        let plaintext = Zeroizing::new(plaintext.to_string());
        offload(move || password::encrypt(&config, &secret, &plaintext)).await
    }

    async fn decrypt_symmetric(&self, password: &str, ciphertext: &str) -> CryptoResult<String> {
        let secret = Zeroizing::new(password.to_string());
        let ciphertext = ciphertext.to_string();
        offload(move || password::decrypt(&secret, &ciphertext)).await
    }
}
