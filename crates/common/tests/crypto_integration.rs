//! Integration tests for secret sealing

#![cfg(feature = "runtime")]

use unibridge_common::{ErrorClassification, SecretCipher};

#[test]
fn sealed_tokens_open_with_the_same_key() {
    let key_hex = SecretCipher::generate_key_hex();
    assert_eq!(key_hex.len(), 64);

    let writer = SecretCipher::from_hex(&key_hex).expect("cipher from generated key");
    let reader = SecretCipher::from_hex(&key_hex).expect("cipher from generated key");

    let sealed = writer.seal("zendesk-oauth-token").expect("seal succeeds");
    assert!(!sealed.contains("zendesk-oauth-token"));

    let opened = reader.open(&sealed).expect("open succeeds");
    assert_eq!(opened.as_str(), "zendesk-oauth-token");
}

#[test]
fn tampered_ciphertext_is_a_critical_failure() {
    let cipher = SecretCipher::from_hex(&SecretCipher::generate_key_hex()).expect("cipher");
    let mut sealed = cipher.seal("token").expect("seal succeeds");

    let last = sealed.pop().expect("non-empty sealed value");
    sealed.push(if last == 'A' { 'B' } else { 'A' });

    let err = cipher.open(&sealed).expect_err("tampered value must not open");
    assert!(err.is_critical() || !err.is_retryable());
}
