//! AES-GCM implementation of the core `SecretDecryptor` port
use unibridge_common::SecretCipher;
use unibridge_core::SecretDecryptor;
use unibridge_domain::{Result, SealedSecret, UnibridgeError};
use zeroize::Zeroizing;

use crate::errors::InfraError;

/// Opens provider access tokens sealed with the installation key.
#[derive(Debug)]
pub struct AesSecretDecryptor {
    cipher: SecretCipher,
}

impl AesSecretDecryptor {
    /// Decryptor over an AES-GCM cipher.
    pub fn new(cipher: SecretCipher) -> Self {
        Self { cipher }
    }

    /// Build from a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let cipher = SecretCipher::from_hex(key_hex).map_err(InfraError::from)?;
        Ok(Self::new(cipher))
    }

    /// Seal a plaintext token for storage on a connection.
    pub fn seal(&self, plaintext: &str) -> Result<SealedSecret> {
        if plaintext.is_empty() {
            return Err(UnibridgeError::InvalidInput("access token must not be empty".into()));
        }
        let sealed = self.cipher.seal(plaintext).map_err(InfraError::from)?;
        Ok(SealedSecret::new(sealed))
    }
}

impl SecretDecryptor for AesSecretDecryptor {
    fn decrypt(&self, secret: &SealedSecret) -> Result<Zeroizing<String>> {
        if secret.is_empty() {
            return Err(UnibridgeError::Security("connection has no access token".into()));
        }
        let plaintext = self.cipher.open(secret.as_str()).map_err(InfraError::from)?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decryptor() -> AesSecretDecryptor {
        AesSecretDecryptor::from_hex(&SecretCipher::generate_key_hex()).unwrap()
    }

    #[test]
    fn sealed_tokens_open_again() {
        let decryptor = decryptor();
        let sealed = decryptor.seal("zd-token-123").unwrap();

        assert!(!sealed.as_str().contains("zd-token-123"));
        assert_eq!(decryptor.decrypt(&sealed).unwrap().as_str(), "zd-token-123");
    }

    #[test]
    fn another_key_cannot_open() {
        let sealed = decryptor().seal("fs-token").unwrap();
        let err = decryptor().decrypt(&sealed).unwrap_err();
        assert!(matches!(err, UnibridgeError::Security(_)));
    }

    #[test]
    fn empty_secrets_are_refused() {
        let decryptor = decryptor();
        assert!(matches!(
            decryptor.decrypt(&SealedSecret::new(String::new())).unwrap_err(),
            UnibridgeError::Security(_)
        ));
        assert!(matches!(decryptor.seal("").unwrap_err(), UnibridgeError::InvalidInput(_)));
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(AesSecretDecryptor::from_hex("not-hex").is_err());
        assert!(AesSecretDecryptor::from_hex(&"ab".repeat(16)).is_err());
    }
}
