//! Linked connections and their sealed credentials

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::provider::Provider;

/// Ciphertext of a connection secret.
///
/// Opaque to every component except the decrypt boundary. `Debug` never
/// prints the contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wrap an already sealed token.
    pub fn new(ciphertext: impl Into<String>) -> Self {
        Self(ciphertext.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealedSecret([REDACTED])")
    }
}

/// Authenticated link between an end-user account and one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub linked_user_id: String,
    pub organization_id: String,
    pub provider: Provider,
    pub access_token: SealedSecret,
    /// Provider-specific settings such as `base_url`
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Active connection with a fresh id and no metadata.
    pub fn new(
        linked_user_id: impl Into<String>,
        organization_id: impl Into<String>,
        provider: Provider,
        access_token: SealedSecret,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            linked_user_id: linked_user_id.into(),
            organization_id: organization_id.into(),
            provider,
            access_token,
            metadata: BTreeMap::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Provider specific setting stored on the connection.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
