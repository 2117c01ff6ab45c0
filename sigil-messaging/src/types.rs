//! Results handed back to callers.

use serde::{Deserialize, Serialize};

/// A freshly encrypted message and the session key used for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedItem {
    /// Hex session key. Callers that keep it can share without unwrapping.
    pub key: String,
    pub envelope: String,
}

/// An opened envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageItem {
    /// Recovered hex session key.
    pub key: String,
    /// Recovered plaintext.
    pub data: String,
}

/// What [`receive`](crate::Identity::receive) returns.
pub type ReceiveItemOut = MessageItem;

/// An existing message re-wrapped for one more recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareItemOut {
    /// Armored public key the receiver verifies the re-wrap against.
    pub sender_public_key: String,
    pub receiver_encrypted_message: String,
}

/// A new message encrypted for its sender and shared in one step.
///
/// Both envelopes carry byte-identical encrypted data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareNewItemOut {
    pub sender_public_key: String,
    pub sender_encrypted_message: String,
    pub receiver_encrypted_message: String,
}

/// An identity's exportable key pair. The private key stays
/// passphrase-protected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterKeys {
    pub private_key: String,
    pub public_key: String,
}
