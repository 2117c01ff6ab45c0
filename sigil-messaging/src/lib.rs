//! End-to-end encrypted messaging between Sigil identities.
//!
//! Provides hybrid envelope encryption with:
//! - Identity key pairs built fresh or imported from an export
//! - One-time bulk encryption under a per-message session key
//! - Signed key wraps verified against explicit trust sets
//! - Pairwise sharing by re-wrapping the session key only
//!
//! All cryptography goes through a [`CryptoProvider`]; [`NativeProvider`] is
//! the default.
//!
//! ```no_run
//! # async fn demo() -> sigil_messaging::MessagingResult<()> {
//! use std::sync::Arc;
//! use sigil_messaging::{Identity, NativeProvider};
//!
//! let provider = Arc::new(NativeProvider::default());
//! let mut alice = Identity::new(Arc::clone(&provider), "alice", "alice passphrase");
//! let mut bob = Identity::new(provider, "bob", "bob passphrase");
//! alice.build().await?;
//! bob.build().await?;
//!
//! let item = alice.encrypt("hello").await?;
//! let bob_key = bob.public_key_armored().unwrap_or_default().to_string();
//! let shared = alice.share(&bob_key, &item.envelope).await?;
//! let opened = bob
//!     .receive(&shared.sender_public_key, &shared.receiver_encrypted_message)
//!     .await?;
//! assert_eq!(opened.data, "hello");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
mod identity;
mod orchestrator;
mod sharing;
pub mod types;

pub use codec::Envelope;
pub use error::{ErrorKind, MessagingError, MessagingResult, Operation};
pub use identity::Identity;
pub use sigil_crypto::{
    CryptoError, CryptoProvider, NativeProvider, PrivateKeyHandle, ProviderConfig,
    PublicKeyHandle,
};
pub use types::*;
