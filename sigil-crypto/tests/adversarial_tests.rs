//! Adversarial tests for armored messages.
//!
//! Validates that:
//! - Corrupting any part of an armored message is detected
//! - Messages cannot be opened by keys they were not sealed for
//! - Symmetric and asymmetric armor are not interchangeable

use sigil_crypto::{CryptoError, CryptoProvider, NativeProvider, ProviderConfig};

fn provider() -> NativeProvider {
    NativeProvider::new(ProviderConfig::low_cost())
}

/// Replaces the base64 character at body offset `at` with a different one.
fn corrupt_body(armored: &str, at: usize) -> String {
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

#[tokio::test]
async fn corrupted_asymmetric_message_never_decrypts() {
    let provider = provider();
    let pair = provider.generate_key_pair("pw", "alice").await.unwrap();
    let locked = provider.read_private_key(&pair.private_key).await.unwrap();
    let private = provider.decrypt_private_key(locked, "pw").await.unwrap();
    let public = provider.read_public_key(&pair.public_key).await.unwrap();

    let msg = provider
        .encrypt_asymmetric(Some(&private), &[public.clone()], "the session key")
        .await
        .unwrap();

    for at in [0, 17, 101, 250, 499, 777] {
        let tampered = corrupt_body(&msg, at);
        assert_ne!(tampered, msg);
        let err = provider
            .decrypt_asymmetric(&private, &[public.clone()], &tampered, true)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                CryptoError::Decryption(_) | CryptoError::SignatureVerification(_)
            ),
            "tampering at {at} gave {err:?}"
        );
    }
}

#[tokio::test]
async fn corrupted_symmetric_message_never_decrypts() {
    let provider = provider();
    let msg = provider.encrypt_symmetric("pw", "bulk").await.unwrap();

    for at in [0, 9, 64, 130, 200] {
        let tampered = corrupt_body(&msg, at);
        assert!(
            matches!(
                provider.decrypt_symmetric("pw", &tampered).await,
                Err(CryptoError::Decryption(_))
            ),
            "tampering at {at} was not detected"
        );
    }
}

#[tokio::test]
async fn armor_kinds_are_not_interchangeable() {
    let provider = provider();
    let pair = provider.generate_key_pair("pw", "alice").await.unwrap();
    let locked = provider.read_private_key(&pair.private_key).await.unwrap();
    let private = provider.decrypt_private_key(locked, "pw").await.unwrap();

    let symmetric = provider.encrypt_symmetric("pw", "bulk").await.unwrap();
    assert!(matches!(
        provider
            .decrypt_asymmetric(&private, &[], &symmetric, false)
            .await,
        Err(CryptoError::Decryption(_))
    ));
}

#[tokio::test]
async fn truncated_message_fails() {
    let provider = provider();
    let msg = provider.encrypt_symmetric("pw", "bulk").await.unwrap();
    let truncated = &msg[..msg.len() / 2];
    assert!(provider.decrypt_symmetric("pw", truncated).await.is_err());
}

#[tokio::test]
async fn corrupted_private_key_is_rejected() {
    let provider = provider();
    let pair = provider.generate_key_pair("pw", "alice").await.unwrap();
    let tampered = corrupt_body(&pair.private_key, 300);

    // Either the armor/packet no longer parses or the passphrase check fails
    match provider.read_private_key(&tampered).await {
        Err(CryptoError::KeyParse(_)) => {}
        Err(other) => panic!("unexpected error {other:?}"),
        Ok(locked) => {
            let err = provider.decrypt_private_key(locked, "pw").await.unwrap_err();
            assert!(
                matches!(
                    err,
                    CryptoError::Authentication(_) | CryptoError::KeyParse(_)
                ),
                "got {err:?}"
            );
        }
    }
}
