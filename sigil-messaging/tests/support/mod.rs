//! Shared helpers for messaging integration tests.

#![allow(dead_code)]

use sigil_messaging::{Identity, NativeProvider, ProviderConfig};
use std::sync::Arc;

/// Provider with the cheapest KDF settings, so tests stay fast.
pub fn provider() -> Arc<NativeProvider> {
    Arc::new(NativeProvider::new(ProviderConfig::low_cost()))
}

/// A built identity named `user` with passphrase `"<user> passphrase"`.
pub async fn ready_identity(provider: &Arc<NativeProvider>, user: &str) -> Identity {
    let mut identity = Identity::new(Arc::clone(provider), user, format!("{user} passphrase"));
    identity.build().await.expect("build must succeed");
    identity
}

/// Armored public key of a ready identity.
pub fn public_key(identity: &Identity) -> String {
    identity
        .public_key_armored()
        .expect("identity must be ready")
        .to_string()
}

/// Routes `tracing` output to the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Replaces the base64 character at body offset `at` of an armored block
/// with a different one.
pub fn corrupt_armor(armored: &str, at: usize) -> String {
    let mut lines: Vec<String> = armored.lines().map(str::to_string).collect();
    let body_len: usize = lines[1..lines.len() - 1].iter().map(String::len).sum();
    let mut offset = at % body_len;

    for line in lines[1..].iter_mut() {
        if offset < line.len() {
            let original = line.as_bytes()[offset];
            let replacement = if original == b'A' { 'B' } else { 'A' };
            line.replace_range(offset..offset + 1, &replacement.to_string());
            break;
        }
        offset -= line.len();
    }
    lines.join("\n")
}
