//! Signed, multi-recipient messages.
//!
//! The plaintext and its Ed25519 signature are encrypted once under a random
//! content key. The content key is then sealed separately for every
//! recipient with an ephemeral X25519 key (XSalsa20-Poly1305), so adding a
//! recipient costs one key agreement, not a second pass over the payload.

use crate::armor::{ArmorKind, armor, dearmor};
use crate::cipher::{self, EncryptedData, KEY_SIZE, SymmetricKey};
use crate::config::SymmetricCipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{NativePrivateKey, NativePublicKey};
use crypto_box::aead::Aead;
use crypto_box::{SalsaBox, SecretKey};
use ed25519_dalek::{Signature, Signer};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

const MESSAGE_FORMAT_VERSION: u8 = 1;
const SIGNATURE_CONTEXT: &[u8] = b"sigil-signed-message-v1";
const PAYLOAD_AAD: &[u8] = b"sigil-message-payload-v1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessagePacket {
    version: u8,
    recipients: Vec<RecipientSlot>,
    payload: EncryptedData,
}

/// Content key sealed for one recipient.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipientSlot {
    fingerprint: String,
    ephemeral_public_key: [u8; 32],
    nonce: [u8; 24],
    sealed_key: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignedPayload {
    signature: Option<SignatureBlock>,
    plaintext: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SignatureBlock {
    signer: String,
    signature: Vec<u8>,
}

fn signed_bytes(plaintext: &str) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(SIGNATURE_CONTEXT.len() + plaintext.len()));
    bytes.extend_from_slice(SIGNATURE_CONTEXT);
    bytes.extend_from_slice(plaintext.as_bytes());
    bytes
}

fn seal_content_key(
    content_key: &SymmetricKey,
    recipient: &NativePublicKey,
) -> CryptoResult<RecipientSlot> {
    let ephemeral = SecretKey::generate(&mut OsRng);
    let salsa_box = SalsaBox::new(recipient.encryption_key(), &ephemeral);

    let mut nonce = [0u8; 24];
    OsRng.fill_bytes(&mut nonce);

    let sealed_key = salsa_box
        .encrypt(
            crypto_box::Nonce::from_slice(&nonce),
            content_key.as_bytes().as_slice(),
        )
        .map_err(|e| CryptoError::Encryption(format!("key seal failed: {e}")))?;

    Ok(RecipientSlot {
        fingerprint: recipient.fingerprint().to_string(),
        ephemeral_public_key: *ephemeral.public_key().as_bytes(),
        nonce,
        sealed_key,
    })
}

fn open_content_key(slot: &RecipientSlot, decryptor: &NativePrivateKey) -> CryptoResult<SymmetricKey> {
    let ephemeral = crypto_box::PublicKey::from(slot.ephemeral_public_key);
    let salsa_box = SalsaBox::new(&ephemeral, decryptor.encryption_secret());

    let opened = Zeroizing::new(
        salsa_box
            .decrypt(
                crypto_box::Nonce::from_slice(&slot.nonce),
                slot.sealed_key.as_slice(),
            )
            .map_err(|_| {
                CryptoError::Decryption("key slot open failed (wrong key or tampered data)".into())
            })?,
    );

    let bytes: [u8; KEY_SIZE] = opened.as_slice().try_into().map_err(|_| {
        CryptoError::Decryption(format!("content key has length {}", opened.len()))
    })?;
    Ok(SymmetricKey::from_bytes(bytes))
}

/// Encrypts `plaintext` for every key in `recipients`, signed by `signer`
/// when one is given.
pub fn encrypt(
    cipher: SymmetricCipher,
    signer: Option<&NativePrivateKey>,
    recipients: &[NativePublicKey],
    plaintext: &str,
) -> CryptoResult<String> {
    if recipients.is_empty() {
        return Err(CryptoError::Encryption(
            "at least one recipient is required".into(),
        ));
    }

    let signature = signer.map(|key| SignatureBlock {
        signer: key.fingerprint().to_string(),
        signature: key.signing_key().sign(&signed_bytes(plaintext)).to_bytes().to_vec(),
    });
    let payload = SignedPayload {
        signature,
        plaintext: plaintext.to_string(),
    };
    let payload_bytes = Zeroizing::new(
        serde_json::to_vec(&payload)
            .map_err(|e| CryptoError::Encryption(format!("serialize payload: {e}")))?,
    );

    let content_key = SymmetricKey::random();
    let sealed_payload = cipher::encrypt(cipher, &content_key, &payload_bytes, PAYLOAD_AAD)?;

    let mut slots: Vec<RecipientSlot> = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        if slots.iter().any(|s| s.fingerprint == recipient.fingerprint()) {
            continue;
        }
        slots.push(seal_content_key(&content_key, recipient)?);
    }

    let packet = MessagePacket {
        version: MESSAGE_FORMAT_VERSION,
        recipients: slots,
        payload: sealed_payload,
    };
    let bytes = serde_json::to_vec(&packet)
        .map_err(|e| CryptoError::Encryption(format!("serialize message: {e}")))?;
    Ok(armor(ArmorKind::Message, &bytes))
}

/// Decrypts a message addressed to `decryptor` and checks its signature.
///
/// A present signature must come from a key in `verification_keys` and must
/// verify. An absent signature, or one from a signer outside the set, is only
/// tolerated when `expect_signed` is false.
pub fn decrypt(
    decryptor: &NativePrivateKey,
    verification_keys: &[NativePublicKey],
    armored: &str,
    expect_signed: bool,
) -> CryptoResult<String> {
    let bytes = dearmor(ArmorKind::Message, armored)
        .map_err(|e| CryptoError::Decryption(format!("malformed message: {e}")))?;
    let packet: MessagePacket = serde_json::from_slice(&bytes)
        .map_err(|e| CryptoError::Decryption(format!("malformed message: {e}")))?;
    if packet.version != MESSAGE_FORMAT_VERSION {
        return Err(CryptoError::Decryption(format!(
            "unsupported message version {}",
            packet.version
        )));
    }

    let slot = packet
        .recipients
        .iter()
        .find(|s| s.fingerprint == decryptor.fingerprint())
        .ok_or_else(|| {
            CryptoError::Decryption(format!(
                "message is not addressed to key {}",
                decryptor.fingerprint()
            ))
        })?;

    let content_key = open_content_key(slot, decryptor)?;
    let payload_bytes = cipher::decrypt(&content_key, &packet.payload, PAYLOAD_AAD)?;
    let payload: SignedPayload = serde_json::from_slice(&payload_bytes)
        .map_err(|e| CryptoError::Decryption(format!("malformed payload: {e}")))?;

    match &payload.signature {
        None if expect_signed => {
            return Err(CryptoError::SignatureVerification(
                "message is not signed".into(),
            ));
        }
        None => {}
        Some(block) => {
            match verification_keys.iter().find(|k| k.fingerprint() == block.signer) {
                Some(key) => {
                    let signature = Signature::from_slice(&block.signature).map_err(|e| {
                        CryptoError::SignatureVerification(format!("malformed signature: {e}"))
                    })?;
                    key.verifying_key()
                        .verify_strict(&signed_bytes(&payload.plaintext), &signature)
                        .map_err(|_| {
                            CryptoError::SignatureVerification(format!(
                                "invalid signature from {}",
                                block.signer
                            ))
                        })?;
                }
                None if expect_signed => {
                    return Err(CryptoError::SignatureVerification(format!(
                        "signer {} is not in the verification set",
                        block.signer
                    )));
                }
                None => {}
            }
        }
    }

    Ok(payload.plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::key::{decrypt_private_key, generate_key_pair, read_private_key, read_public_key};

    fn identity(user: &str) -> (NativePrivateKey, NativePublicKey) {
        let pair = generate_key_pair(&ProviderConfig::low_cost(), "pass", user).unwrap();
        let locked = read_private_key(&pair.private_key).unwrap();
        let private = decrypt_private_key(&locked, "pass").unwrap();
        let public = read_public_key(&pair.public_key).unwrap();
        (private, public)
    }

    #[test]
    fn every_recipient_can_open() {
        let (alice, alice_pub) = identity("alice");
        let (bob, bob_pub) = identity("bob");

        let msg = encrypt(
            SymmetricCipher::default(),
            Some(&alice),
            &[alice_pub.clone(), bob_pub],
            "hello",
        )
        .unwrap();

        let trust = [alice_pub];
        assert_eq!(decrypt(&alice, &trust, &msg, true).unwrap(), "hello");
        assert_eq!(decrypt(&bob, &trust, &msg, true).unwrap(), "hello");
    }

    #[test]
    fn non_recipient_cannot_open() {
        let (alice, alice_pub) = identity("alice");
        let (carol, _) = identity("carol");

        let msg = encrypt(SymmetricCipher::default(), Some(&alice), &[alice_pub.clone()], "x")
            .unwrap();
        assert!(matches!(
            decrypt(&carol, &[alice_pub], &msg, true),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn duplicate_recipients_get_one_slot() {
        let (alice, alice_pub) = identity("alice");
        let msg = encrypt(
            SymmetricCipher::default(),
            Some(&alice),
            &[alice_pub.clone(), alice_pub.clone()],
            "x",
        )
        .unwrap();

        let bytes = dearmor(ArmorKind::Message, &msg).unwrap();
        let packet: MessagePacket = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(packet.recipients.len(), 1);
    }

    #[test]
    fn unknown_signer_rejected_only_when_signature_expected() {
        let (alice, alice_pub) = identity("alice");
        let (bob, bob_pub) = identity("bob");

        let msg = encrypt(SymmetricCipher::default(), Some(&bob), &[alice_pub.clone()], "x")
            .unwrap();

        assert!(matches!(
            decrypt(&alice, &[alice_pub.clone()], &msg, true),
            Err(CryptoError::SignatureVerification(_))
        ));
        assert_eq!(decrypt(&alice, &[alice_pub.clone()], &msg, false).unwrap(), "x");
        assert_eq!(decrypt(&alice, &[bob_pub], &msg, true).unwrap(), "x");
    }

    #[test]
    fn unsigned_message_rejected_when_signature_expected() {
        let (alice, alice_pub) = identity("alice");

        let msg = encrypt(SymmetricCipher::default(), None, &[alice_pub.clone()], "x").unwrap();

        assert!(matches!(
            decrypt(&alice, &[alice_pub.clone()], &msg, true),
            Err(CryptoError::SignatureVerification(_))
        ));
        assert_eq!(decrypt(&alice, &[alice_pub], &msg, false).unwrap(), "x");
    }

    #[test]
    fn no_recipients_is_encryption_error() {
        let (alice, _) = identity("alice");
        assert!(matches!(
            encrypt(SymmetricCipher::default(), Some(&alice), &[], "x"),
            Err(CryptoError::Encryption(_))
        ));
    }
}
