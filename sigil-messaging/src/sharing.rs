//! Pairwise sharing.
//!
//! Sharing re-wraps a message's session key for one more recipient. The
//! encrypted data is carried over byte for byte, never re-encrypted.

use crate::codec::Envelope;
use crate::error::{During, MessagingResult, Operation};
use crate::identity::Identity;
use crate::orchestrator::Trust;
use crate::types::{ReceiveItemOut, ShareItemOut, ShareNewItemOut};
use sigil_crypto::{CryptoProvider, PublicKeyHandle};
use tracing::{debug, warn};
use zeroize::Zeroizing;

impl<P: CryptoProvider> Identity<P> {
    /// Re-wraps an envelope this identity can open so that `receiver` can
    /// open it too.
    ///
    /// The input's wrapped key must be signed by this identity; envelopes
    /// received from others have to be re-encrypted with
    /// [`share_new`](Self::share_new) instead.
    pub async fn share(
        &self,
        receiver_public_key_armored: &str,
        envelope: &str,
    ) -> MessagingResult<ShareItemOut> {
        let op = Operation::Share;
        let keys = self.keys(op)?;
        let provider = &self.provider;

        let original = Envelope::unpack(envelope).during(op)?;

        let (receiver, session_key) = tokio::try_join!(
            provider.read_public_key(receiver_public_key_armored),
            provider.decrypt_asymmetric(
                &keys.private_key,
                std::slice::from_ref(&keys.public_key),
                &original.wrapped_key,
                true,
            ),
        )
        .during(op)
        .inspect_err(|err| {
            if err.is_security_relevant() {
                warn!("{op}: refusing to re-wrap envelope: {}", err.kind);
            }
        })?;
        let session_key = Zeroizing::new(session_key);

        let wrapped_key = provider
            .encrypt_asymmetric(
                Some(&keys.private_key),
                &[keys.public_key.clone(), receiver.clone()],
                &session_key,
            )
            .await
            .during(op)?;
        let receiver_envelope = original.with_wrapped_key(wrapped_key).pack().during(op)?;

        debug!(
            "{op}: re-wrapped envelope from {} for {}",
            keys.public_key.fingerprint(),
            receiver.fingerprint()
        );

        Ok(ShareItemOut {
            sender_public_key: keys.public_key_armored.clone(),
            receiver_encrypted_message: receiver_envelope,
        })
    }

    /// Encrypts `data` for this identity and shares it with `receiver` in
    /// one step. The receiver's envelope is wrapped for the receiver alone.
    pub async fn share_new(
        &self,
        receiver_public_key_armored: &str,
        data: &str,
    ) -> MessagingResult<ShareNewItemOut> {
        let op = Operation::ShareNew;
        let keys = self.keys(op)?;
        let provider = &self.provider;

        let (sealed, receiver) = tokio::try_join!(
            self.seal(op, data),
            async {
                provider
                    .read_public_key(receiver_public_key_armored)
                    .await
                    .during(op)
            },
        )?;

        let wrapped_key = provider
            .encrypt_asymmetric(
                Some(&keys.private_key),
                std::slice::from_ref(&receiver),
                &sealed.session_key,
            )
            .await
            .during(op)?;
        let receiver_envelope = sealed
            .envelope
            .with_wrapped_key(wrapped_key)
            .pack()
            .during(op)?;

        debug!(
            "{op}: shared new envelope from {} with {}",
            keys.public_key.fingerprint(),
            receiver.fingerprint()
        );

        Ok(ShareNewItemOut {
            sender_public_key: keys.public_key_armored.clone(),
            sender_encrypted_message: sealed.packed,
            receiver_encrypted_message: receiver_envelope,
        })
    }

    /// Opens an envelope that must be signed by `sender` and nobody else.
    ///
    /// This identity's own key is not trusted here, so an envelope it
    /// wrapped itself is rejected.
    pub async fn receive(
        &self,
        sender_public_key_armored: &str,
        envelope: &str,
    ) -> MessagingResult<ReceiveItemOut> {
        self.open(
            Operation::Receive,
            envelope,
            Trust::Only(std::slice::from_ref(&sender_public_key_armored)),
        )
        .await
    }
}
