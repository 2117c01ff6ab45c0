//! Identity key lifecycle.
//!
//! An [`Identity`] starts without keys. [`Identity::build`] generates a
//! fresh pair, [`Identity::load`] imports an exported one; either makes the
//! identity ready, after which its keys never change.

use crate::error::{During, ErrorKind, MessagingResult, Operation};
use crate::types::MasterKeys;
use sigil_crypto::{CryptoError, CryptoProvider, NativeProvider, PrivateKeyHandle, PublicKeyHandle};
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Unlocked key material of a ready identity.
pub(crate) struct IdentityKeys<P: CryptoProvider> {
    pub(crate) private_key: P::PrivateKey,
    pub(crate) public_key: P::PublicKey,
    pub(crate) private_key_armored: String,
    pub(crate) public_key_armored: String,
}

/// A user's key pair and the operations that need it.
pub struct Identity<P: CryptoProvider = NativeProvider> {
    pub(crate) provider: Arc<P>,
    user_id: String,
    passphrase: Zeroizing<String>,
    keys: Option<IdentityKeys<P>>,
}

impl<P: CryptoProvider> Identity<P> {
    /// Creates an identity without keys. Call [`build`](Self::build) or
    /// [`load`](Self::load) before anything else.
    pub fn new(provider: Arc<P>, user_id: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            provider,
            user_id: user_id.into(),
            passphrase: Zeroizing::new(passphrase.into()),
            keys: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns whether keys are loaded.
    pub fn is_ready(&self) -> bool {
        self.keys.is_some()
    }

    /// Armored public key, once keys are loaded.
    pub fn public_key_armored(&self) -> Option<&str> {
        self.keys.as_ref().map(|k| k.public_key_armored.as_str())
    }

    /// Fingerprint of the public key, once keys are loaded.
    pub fn fingerprint(&self) -> Option<&str> {
        self.keys.as_ref().map(|k| k.public_key.fingerprint())
    }

    /// Generates a new key pair protected with this identity's passphrase.
    pub async fn build(&mut self) -> MessagingResult<()> {
        let op = Operation::Build;
        if self.keys.is_some() {
            return Err(ErrorKind::AlreadyLoaded).during(op);
        }

        let pair = self
            .provider
            .generate_key_pair(&self.passphrase, &self.user_id)
            .await
            .during(op)?;
        let keys = self
            .unlock(pair.private_key, pair.public_key)
            .await
            .during(op)?;

        info!(
            "built identity {} ({})",
            self.user_id,
            keys.public_key.fingerprint()
        );
        self.keys = Some(keys);
        Ok(())
    }

    /// Imports an exported key pair, unlocking the private key with this
    /// identity's passphrase.
    pub async fn load(
        &mut self,
        private_key_armored: &str,
        public_key_armored: &str,
    ) -> MessagingResult<()> {
        let op = Operation::Load;
        if self.keys.is_some() {
            return Err(ErrorKind::AlreadyLoaded).during(op);
        }

        let keys = match self
            .unlock(private_key_armored.to_string(), public_key_armored.to_string())
            .await
        {
            Ok(keys) => keys,
            Err(err) => {
                if matches!(err, CryptoError::Authentication(_)) {
                    warn!("rejected passphrase while loading identity {}", self.user_id);
                }
                return Err(err).during(op);
            }
        };

        info!(
            "loaded identity {} ({})",
            self.user_id,
            keys.public_key.fingerprint()
        );
        self.keys = Some(keys);
        Ok(())
    }

    /// Returns the exportable key pair exactly as held.
    pub fn export_master_keys(&self) -> MessagingResult<MasterKeys> {
        let keys = self.keys(Operation::ExportMasterKeys)?;
        Ok(MasterKeys {
            private_key: keys.private_key_armored.clone(),
            public_key: keys.public_key_armored.clone(),
        })
    }

    pub(crate) fn keys(&self, operation: Operation) -> MessagingResult<&IdentityKeys<P>> {
        self.keys.as_ref().ok_or(ErrorKind::NotReady).during(operation)
    }

    /// Unlocks the private key while parsing the public key.
    async fn unlock(
        &self,
        private_key_armored: String,
        public_key_armored: String,
    ) -> Result<IdentityKeys<P>, CryptoError> {
        let provider = &self.provider;
        let (private_key, public_key) = tokio::try_join!(
            async {
                let locked = provider.read_private_key(&private_key_armored).await?;
                provider.decrypt_private_key(locked, &self.passphrase).await
            },
            provider.read_public_key(&public_key_armored),
        )?;

        if private_key.fingerprint() != public_key.fingerprint() {
            return Err(CryptoError::KeyParse(format!(
                "private key {} does not belong to public key {}",
                private_key.fingerprint(),
                public_key.fingerprint()
            )));
        }

        Ok(IdentityKeys {
            private_key,
            public_key,
            private_key_armored,
            public_key_armored,
        })
    }
}

impl<P: CryptoProvider> std::fmt::Debug for Identity<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("user_id", &self.user_id)
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}
