//! Configuration structures
//!
//! Every section has defaults so a partial file is valid. Loading lives in
//! `unibridge-infra::config`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, UnibridgeError};
use crate::types::{ObjectType, Provider};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub retry: RetrySettings,
    pub sync: SyncConfig,
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
    pub secrets: SecretsConfig,
}

impl Config {
    /// Check value ranges the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        self.retry.validate()?;
        if self.sync.page_timeout_secs == 0 {
            return Err(UnibridgeError::Config("sync.page_timeout_secs must be > 0".into()));
        }
        if self.sync.interval_secs == 0 {
            return Err(UnibridgeError::Config("sync.interval_secs must be > 0".into()));
        }
        if self.database.pool_size == 0 {
            return Err(UnibridgeError::Config("database.pool_size must be > 0".into()));
        }
        if let Some(key) = &self.secrets.key_hex {
            if key.trim().len() != 64 {
                return Err(UnibridgeError::Config(
                    "secrets.key_hex must be 64 hex characters".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Retry policy for provider calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay_ms: 200, max_delay_ms: 10_000, multiplier: 2.0 }
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(UnibridgeError::Config("retry.max_attempts must be > 0".into()));
        }
        if self.multiplier < 1.0 {
            return Err(UnibridgeError::Config("retry.multiplier must be >= 1.0".into()));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(UnibridgeError::Config(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// What happens when a sync is triggered for a pair that is already running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Wait for the running sync to finish, then run
    #[default]
    Queue,
    /// Fail immediately with `SyncInProgress`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Timeout for pulling and persisting a single page
    pub page_timeout_secs: u64,
    pub overlap: OverlapPolicy,
    /// Period of the background sync worker
    pub interval_secs: u64,
    pub object_types: Vec<ObjectType>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: 60,
            overlap: OverlapPolicy::Queue,
            interval_secs: 900,
            object_types: ObjectType::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "unibridge.db".to_string(), pool_size: 4 }
    }
}

/// Endpoint settings for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoint {
    /// Default API root; a connection's `base_url` metadata overrides it
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderEndpoint {
    fn default() -> Self {
        Self { base_url: None, timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub zendesk: ProviderEndpoint,
    pub freshsales: ProviderEndpoint,
}

impl ProvidersConfig {
    /// Endpoint settings of `provider`.
    pub fn endpoint(&self, provider: Provider) -> &ProviderEndpoint {
        match provider {
            Provider::Zendesk => &self.zendesk,
            Provider::Freshsales => &self.freshsales,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// 64 hex characters; when absent the key comes from the environment or
    /// the OS keyring
    pub key_hex: Option<String>,
}

impl fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("key_hex", &self.key_hex.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
