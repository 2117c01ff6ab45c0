//! Envelope encryption.
//!
//! Bulk data is encrypted exactly once, under a fresh session key. Only the
//! session key is encrypted asymmetrically ("wrapped"), and it is signed by
//! the wrapping identity, so a message can later be re-targeted by wrapping
//! the same session key again.

use crate::codec::Envelope;
use crate::error::{During, MessagingError, MessagingResult, Operation};
use crate::identity::Identity;
use crate::types::{EncryptedItem, MessageItem};
use futures::future::try_join_all;
use sigil_crypto::{CryptoProvider, PublicKeyHandle};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Whose signatures an opened envelope may carry.
pub(crate) enum Trust<'a> {
    /// The identity's own key plus the given armored keys.
    SelfAnd(&'a [&'a str]),
    /// Exactly the given armored keys.
    Only(&'a [&'a str]),
}

/// A new envelope with its unpacked parts still at hand.
pub(crate) struct Sealed {
    pub(crate) session_key: Zeroizing<String>,
    pub(crate) envelope: Envelope,
    pub(crate) packed: String,
}

impl<P: CryptoProvider> Identity<P> {
    /// Encrypts `data` for this identity alone.
    pub async fn encrypt(&self, data: &str) -> MessagingResult<EncryptedItem> {
        let sealed = self.seal(Operation::Encrypt, data).await?;
        Ok(EncryptedItem {
            key: sealed.session_key.to_string(),
            envelope: sealed.packed,
        })
    }

    /// Opens an envelope addressed to this identity.
    ///
    /// The wrapped key must be signed by this identity or by one of
    /// `external_verification_keys` (armored public keys).
    pub async fn decrypt(
        &self,
        envelope: &str,
        external_verification_keys: &[&str],
    ) -> MessagingResult<MessageItem> {
        self.open(
            Operation::Decrypt,
            envelope,
            Trust::SelfAnd(external_verification_keys),
        )
        .await
    }

    pub(crate) async fn seal(&self, op: Operation, data: &str) -> MessagingResult<Sealed> {
        let keys = self.keys(op)?;
        let provider = &self.provider;

        let session_key = Zeroizing::new(
            provider
                .generate_session_key(&keys.public_key)
                .await
                .during(op)?,
        );

        let (wrapped_key, encrypted_data) = tokio::try_join!(
            provider.encrypt_asymmetric(
                Some(&keys.private_key),
                std::slice::from_ref(&keys.public_key),
                &session_key,
            ),
            provider.encrypt_symmetric(&session_key, data),
        )
        .during(op)?;

        let envelope = Envelope::new(wrapped_key, encrypted_data);
        let packed = envelope.pack().during(op)?;
        debug!(
            "{op}: sealed {} bytes for {}",
            data.len(),
            keys.public_key.fingerprint()
        );

        Ok(Sealed {
            session_key,
            envelope,
            packed,
        })
    }

    pub(crate) async fn open(
        &self,
        op: Operation,
        packed: &str,
        trust: Trust<'_>,
    ) -> MessagingResult<MessageItem> {
        let keys = self.keys(op)?;
        let provider = &self.provider;

        let envelope = Envelope::unpack(packed).during(op)?;

        let (include_self, armored_keys) = match trust {
            Trust::SelfAnd(armored) => (true, armored),
            Trust::Only(armored) => (false, armored),
        };
        let mut verification_keys = try_join_all(
            armored_keys
                .iter()
                .map(|armored| provider.read_public_key(armored)),
        )
        .await
        .during(op)?;
        if include_self {
            verification_keys.insert(0, keys.public_key.clone());
        }

        let session_key = Zeroizing::new(
            provider
                .decrypt_asymmetric(
                    &keys.private_key,
                    &verification_keys,
                    &envelope.wrapped_key,
                    true,
                )
                .await
                .during(op)
                .inspect_err(|err| log_rejection(op, err))?,
        );

        let data = provider
            .decrypt_symmetric(&session_key, &envelope.encrypted_data)
            .await
            .during(op)?;

        debug!(
            "{op}: opened {} bytes with {} trusted signer(s)",
            data.len(),
            verification_keys.len()
        );

        Ok(MessageItem {
            key: session_key.to_string(),
            data,
        })
    }
}

fn log_rejection(op: Operation, err: &MessagingError) {
    if err.is_security_relevant() {
        warn!("{op}: rejected envelope: {}", err.kind);
    }
}
