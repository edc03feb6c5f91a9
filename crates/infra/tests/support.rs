use std::sync::Arc;

use tempfile::TempDir;
use unibridge_common::SecretCipher;
use unibridge_core::CallContext;
use unibridge_domain::{Connection, Provider};
use unibridge_infra::database::DbManager;
use unibridge_infra::integrations::BASE_URL_METADATA_KEY;
use unibridge_infra::AesSecretDecryptor;

pub const ORG: &str = "org-acme";

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Create a migrated database in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Decryptor over a throwaway key.
pub fn decryptor() -> Arc<AesSecretDecryptor> {
    Arc::new(
        AesSecretDecryptor::from_hex(&SecretCipher::generate_key_hex())
            .expect("generated key should be valid"),
    )
}

/// Active connection with a sealed token, pointed at `base_url`.
pub fn connection(
    decryptor: &AesSecretDecryptor,
    provider: Provider,
    token: &str,
    base_url: &str,
) -> Connection {
    let sealed = decryptor.seal(token).expect("token should seal");
    Connection::new("user-1", ORG, provider, sealed)
        .with_metadata(BASE_URL_METADATA_KEY, base_url)
}

pub fn call_context(connection: Connection, decryptor: &Arc<AesSecretDecryptor>) -> CallContext {
    CallContext::new(connection, decryptor.clone())
}
