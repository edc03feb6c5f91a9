//! AES-256-GCM sealing for short secrets such as provider access tokens.
//!
//! Sealed values are self-describing strings: `v1:` followed by the base64
//! encoding of `nonce || ciphertext`. A fresh 96-bit nonce is drawn for every
//! seal, so sealing the same token twice yields different ciphertexts.
//!
//! ```rust
//! use unibridge_common::crypto::SecretCipher;
//!
//! let cipher = SecretCipher::from_hex(&SecretCipher::generate_key_hex())?;
//! let sealed = cipher.seal("zd-access-token")?;
//! assert_eq!(cipher.open(&sealed)?.as_str(), "zd-access-token");
//! # Ok::<(), unibridge_common::error::CommonError>(())
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{CommonError, CommonResult};

/// Version prefix carried by every sealed value.
pub const SEALED_SECRET_PREFIX: &str = "v1:";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher bound to a single 32-byte key.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").field("key", &"[REDACTED]").finish()
    }
}

impl SecretCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CommonError::validation(
                "key",
                format!("encryption key must be exactly {KEY_LEN} bytes, got {}", key.len()),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CommonError::crypto(format!("failed to create cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Create a cipher from a 64-character hex key.
    pub fn from_hex(key_hex: &str) -> CommonResult<Self> {
        let key = Zeroizing::new(
            hex::decode(key_hex.trim())
                .map_err(|e| CommonError::validation("key_hex", format!("invalid hex: {e}")))?,
        );
        Self::new(&key)
    }

    /// Generate a random key, hex encoded.
    pub fn generate_key_hex() -> String {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut key[..]);
        hex::encode(&key[..])
    }

    /// Seal a plaintext secret into its versioned string form.
    pub fn seal(&self, plaintext: &str) -> CommonResult<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| CommonError::crypto(format!("encryption failed: {e}")))?;

        let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);

        Ok(format!("{SEALED_SECRET_PREFIX}{}", BASE64.encode(envelope)))
    }

    /// Open a sealed secret. The plaintext is wiped from memory on drop.
    pub fn open(&self, sealed: &str) -> CommonResult<Zeroizing<String>> {
        let encoded = sealed
            .strip_prefix(SEALED_SECRET_PREFIX)
            .ok_or_else(|| CommonError::crypto("sealed secret has an unknown version prefix"))?;

        let envelope = BASE64
            .decode(encoded)
            .map_err(|e| CommonError::serialization("base64", e.to_string()))?;

        if envelope.len() <= NONCE_LEN {
            return Err(CommonError::crypto("sealed secret is truncated"));
        }
        let (nonce, ciphertext) = envelope.split_at(NONCE_LEN);

        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| {
                    CommonError::crypto("decryption failed: key mismatch or tampered data")
                })?,
        );

        std::str::from_utf8(&plaintext)
            .map(|text| Zeroizing::new(text.to_owned()))
            .map_err(|e| CommonError::serialization("utf-8", e.to_string()))
    }
}
