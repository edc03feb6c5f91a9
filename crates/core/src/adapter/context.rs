use std::fmt;
use std::sync::Arc;

use unibridge_domain::{Connection, Result};
use zeroize::Zeroizing;

use super::ports::SecretDecryptor;

/// Per-call context handed to adapter I/O methods.
///
/// Carries the connection and the decrypt boundary; the access token is only
/// decrypted when an adapter asks for it and is never cached.
#[derive(Clone)]
pub struct CallContext {
    connection: Connection,
    decryptor: Arc<dyn SecretDecryptor>,
}

impl CallContext {
    /// Context for calls made on behalf of `connection`.
    pub fn new(connection: Connection, decryptor: Arc<dyn SecretDecryptor>) -> Self {
        Self { connection, decryptor }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Decrypted access token, wiped on drop.
    pub fn access_token(&self) -> Result<Zeroizing<String>> {
        self.decryptor.decrypt(&self.connection.access_token)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("connection_id", &self.connection.id)
            .finish_non_exhaustive()
    }
}
