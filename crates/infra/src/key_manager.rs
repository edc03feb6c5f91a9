//! Sealing key resolution
//!
//! The key that seals provider access tokens is looked up in order:
//! `secrets.key_hex` from configuration, the `UNIBRIDGE_SECRETS_KEY`
//! environment variable, then the system keyring. A keyring without an entry
//! gets a freshly generated key.
use keyring::{Entry, Error as KeyringError};
use tracing::{debug, info};
use unibridge_common::SecretCipher;
use unibridge_domain::{Result, SecretsConfig};
use zeroize::Zeroizing;

use crate::errors::InfraError;

const SERVICE_NAME: &str = "dev.unibridge";
const KEY_NAME: &str = "secrets_sealing_key";

/// Environment variable holding a hex sealing key
pub const SECRETS_KEY_ENV: &str = "UNIBRIDGE_SECRETS_KEY";

/// Manages the sealing key using configuration, environment and system keyring
pub struct KeyManager;

impl KeyManager {
    /// Resolve the sealing key as 64 hex characters.
    pub fn resolve(config: &SecretsConfig) -> Result<Zeroizing<String>> {
        if let Some(key) = config.key_hex.as_deref().filter(|k| !k.trim().is_empty()) {
            debug!("using sealing key from configuration");
            return Ok(Zeroizing::new(key.trim().to_string()));
        }

        if let Ok(key) = std::env::var(SECRETS_KEY_ENV) {
            let key = Zeroizing::new(key);
            if !key.trim().is_empty() {
                debug!("using sealing key from {SECRETS_KEY_ENV}");
                return Ok(Zeroizing::new(key.trim().to_string()));
            }
        }

        Self::get_or_create_key()
    }

    /// Build a cipher from the resolved key.
    pub fn cipher(config: &SecretsConfig) -> Result<SecretCipher> {
        let key = Self::resolve(config)?;
        Ok(SecretCipher::from_hex(&key).map_err(InfraError::from)?)
    }

    /// Get the keyring key, generating and storing one on first use.
    pub fn get_or_create_key() -> Result<Zeroizing<String>> {
        let entry = Self::entry()?;

        match entry.get_password() {
            Ok(key) => Ok(Zeroizing::new(key)),
            Err(KeyringError::NoEntry) => {
                let key = Zeroizing::new(SecretCipher::generate_key_hex());
                entry.set_password(&key).map_err(InfraError::from)?;
                info!(service = SERVICE_NAME, "generated new sealing key in system keyring");
                Ok(key)
            }
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    /// Delete the keyring key. Every stored access token becomes unreadable.
    pub fn delete_key() -> Result<()> {
        Self::entry()?.delete_credential().map_err(InfraError::from)?;
        Ok(())
    }

    fn entry() -> Result<Entry> {
        Ok(Entry::new(SERVICE_NAME, KEY_NAME).map_err(InfraError::from)?)
    }
}
