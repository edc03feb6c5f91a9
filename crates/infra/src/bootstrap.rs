//! Application wiring
//!
//! [`Unibridge::from_config`] opens the database, resolves the sealing key and
//! registers every adapter once. The returned value owns the services request
//! handlers call into.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use unibridge_core::{
    AdapterRegistry, ConnectionRepository, FieldMappingStore, ProviderGateway, RecordStore,
    SyncOrchestrator, UnificationEngine, WriteService,
};
use unibridge_domain::{
    CanonicalObject, CanonicalRecord, Config, Connection, ObjectType, Provider, Result,
    SyncReport, SyncRequest, UnibridgeError,
};
use uuid::Uuid;

use crate::database::{
    DbManager, SqliteConnectionRepository, SqliteMappingRepository, SqliteRecordStore,
};
use crate::integrations::freshsales::FreshsalesContactAdapter;
use crate::integrations::zendesk::{ZendeskCommentAdapter, ZendeskTicketAdapter};
use crate::integrations::ApiEndpoint;
use crate::key_manager::KeyManager;
use crate::scheduling::{SyncWorker, SyncWorkerConfig};
use crate::secrets::AesSecretDecryptor;

/// Register the built-in adapters with their configured endpoints.
pub fn build_registry(config: &Config) -> Result<AdapterRegistry> {
    let zendesk = ApiEndpoint::from_config(config.providers.endpoint(Provider::Zendesk))?;
    let freshsales = ApiEndpoint::from_config(config.providers.endpoint(Provider::Freshsales))?;

    Ok(AdapterRegistry::builder()
        .register_adapter(Arc::new(ZendeskTicketAdapter::new(zendesk.clone())))?
        .register_adapter(Arc::new(ZendeskCommentAdapter::new(zendesk)))?
        .register_adapter(Arc::new(FreshsalesContactAdapter::new(freshsales)))?
        .build())
}

/// Fully wired services over one SQLite database
pub struct Unibridge {
    config: Config,
    db: Arc<DbManager>,
    connections: Arc<SqliteConnectionRepository>,
    records: Arc<SqliteRecordStore>,
    decryptor: Arc<AesSecretDecryptor>,
    mappings: Arc<FieldMappingStore>,
    engine: Arc<UnificationEngine>,
    orchestrator: Arc<SyncOrchestrator>,
    writer: WriteService,
    worker: Mutex<SyncWorker>,
}

impl Unibridge {
    /// Load configuration from the environment or a config file, install
    /// tracing and wire everything.
    pub fn load() -> Result<Self> {
        let config = crate::config::load()?;
        crate::observability::init_tracing(&config.logging)?;
        Self::from_config(config)
    }

    /// Wire everything with the sealing key resolved by [`KeyManager`].
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let decryptor = AesSecretDecryptor::new(KeyManager::cipher(&config.secrets)?);
        Self::with_decryptor(config, decryptor)
    }

    /// Wire everything with an explicit decryptor.
    pub fn with_decryptor(config: Config, decryptor: AesSecretDecryptor) -> Result<Self> {
        let db = Arc::new(DbManager::from_config(&config.database)?);
        db.run_migrations()?;

        let registry = Arc::new(build_registry(&config)?);
        let connections = Arc::new(SqliteConnectionRepository::new(Arc::clone(&db)));
        let records = Arc::new(SqliteRecordStore::new(Arc::clone(&db)));
        let mappings = Arc::new(FieldMappingStore::with_repository(Arc::new(
            SqliteMappingRepository::new(Arc::clone(&db)),
        )));
        let decryptor = Arc::new(decryptor);

        let engine = Arc::new(UnificationEngine::new(registry, Arc::clone(&mappings)));
        let gateway = Arc::new(ProviderGateway::new(&config.retry)?);

        let orchestrator = Arc::new(
            SyncOrchestrator::new(
                Arc::clone(&engine),
                Arc::clone(&gateway),
                records.clone(),
                decryptor.clone(),
            )
            .with_config(&config.sync),
        );
        let writer =
            WriteService::new(Arc::clone(&engine), gateway, records.clone(), decryptor.clone());
        let worker = SyncWorker::new(
            Arc::clone(&orchestrator),
            connections.clone(),
            SyncWorkerConfig::from(&config.sync),
        );

        info!(database = %db.path().display(), "unibridge initialised");

        Ok(Self {
            config,
            db,
            connections,
            records,
            decryptor,
            mappings,
            engine,
            orchestrator,
            writer,
            worker: Mutex::new(worker),
        })
    }

    /// Validated configuration the services were wired from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared SQLite manager.
    pub fn database(&self) -> &Arc<DbManager> {
        &self.db
    }

    /// Unification engine for direct transforms. Mappings are loaded per
    /// organization on demand, so call `mappings().ensure_loaded(org)` before
    /// using the engine for an organization this process has not touched.
    pub fn engine(&self) -> &Arc<UnificationEngine> {
        &self.engine
    }

    /// Repository-backed field mapping store.
    pub fn mappings(&self) -> &Arc<FieldMappingStore> {
        &self.mappings
    }

    /// Sync orchestrator, also driven by the background worker.
    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    /// Persisted canonical records.
    pub fn records(&self) -> Arc<dyn RecordStore> {
        self.records.clone()
    }

    /// Link a user account: seal the plaintext token and store the connection.
    pub async fn link_connection(
        &self,
        linked_user_id: &str,
        organization_id: &str,
        provider: Provider,
        access_token: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<Connection> {
        let sealed = self.decryptor.seal(access_token)?;
        let mut connection = Connection::new(linked_user_id, organization_id, provider, sealed);
        connection.metadata = metadata;

        self.connections.save(&connection).await?;
        info!(connection_id = %connection.id, %provider, "connection linked");
        Ok(connection)
    }

    /// Unlink a connection. Its synced records are kept.
    pub async fn unlink_connection(&self, connection_id: Uuid) -> Result<()> {
        self.connections.deactivate(connection_id).await?;
        info!(%connection_id, "connection unlinked");
        Ok(())
    }

    /// Look a connection up by id, active or not.
    pub async fn connection(&self, connection_id: Uuid) -> Result<Connection> {
        self.connections
            .find(connection_id)
            .await?
            .ok_or_else(|| UnibridgeError::NotFound(format!("connection {connection_id}")))
    }

    /// Sync one object type of a connection now.
    pub async fn sync(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let connection = self.active_connection(connection_id).await?;
        self.orchestrator.run(SyncRequest::new(connection, object_type), cancel).await
    }

    /// Write a canonical object through a connection.
    pub async fn write(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
        canonical: CanonicalObject,
    ) -> Result<CanonicalRecord> {
        let connection = self.active_connection(connection_id).await?;
        self.writer.create(&connection, canonical, object_type).await
    }

    /// Start the periodic sync of all active connections.
    pub async fn start_worker(&self) -> Result<()> {
        self.worker.lock().await.start().await?;
        Ok(())
    }

    /// Stop the periodic sync and wait for the current pass to end.
    pub async fn stop_worker(&self) -> Result<()> {
        self.worker.lock().await.stop().await?;
        Ok(())
    }

    async fn active_connection(&self, connection_id: Uuid) -> Result<Connection> {
        let connection = self.connection(connection_id).await?;
        if !connection.active {
            return Err(UnibridgeError::InvalidInput(format!(
                "connection {connection_id} is not active"
            )));
        }
        Ok(connection)
    }
}
