use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use unibridge_core::ConnectionRepository;
use unibridge_domain::{Connection, Result as DomainResult, SealedSecret, UnibridgeError};
use uuid::Uuid;

use super::manager::{map_sql_error, run_blocking, DbManager, SqliteConnection};
use super::record_repository::{parse_timestamp, parse_uuid};
use crate::errors::InfraError;

const SELECT_CONNECTION: &str = "SELECT id, linked_user_id, organization_id, provider, access_token,
                                        metadata_json, active, created_at
                                 FROM connections";

/// SQLite-backed [`ConnectionRepository`].
///
/// Access tokens are stored exactly as sealed; this repository never sees
/// plaintext.
pub struct SqliteConnectionRepository {
    db: Arc<DbManager>,
}

impl SqliteConnectionRepository {
    /// Repository over the shared database.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionRepository for SqliteConnectionRepository {
    async fn save(&self, connection: &Connection) -> DomainResult<()> {
        let connection = connection.clone();
        run_blocking(&self.db, move |conn| save_connection(conn, &connection)).await
    }

    async fn find(&self, id: Uuid) -> DomainResult<Option<Connection>> {
        run_blocking(&self.db, move |conn| {
            let sql = format!("{SELECT_CONNECTION} WHERE id = ?1");
            conn.query_row(&sql, params![id.to_string()], ConnectionRow::from_row)
                .optional()
                .map_err(map_sql_error)?
                .map(ConnectionRow::into_connection)
                .transpose()
        })
        .await
    }

    async fn list_active(&self) -> DomainResult<Vec<Connection>> {
        run_blocking(&self.db, |conn| {
            let sql = format!("{SELECT_CONNECTION} WHERE active = 1 ORDER BY created_at ASC");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map([], ConnectionRow::from_row)
                .map_err(map_sql_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sql_error)?;
            rows.into_iter().map(ConnectionRow::into_connection).collect()
        })
        .await
    }

    async fn deactivate(&self, id: Uuid) -> DomainResult<()> {
        run_blocking(&self.db, move |conn| {
            let changed = conn
                .execute("UPDATE connections SET active = 0 WHERE id = ?1", params![id.to_string()])
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(UnibridgeError::NotFound(format!("connection {id}")));
            }
            Ok(())
        })
        .await
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn save_connection(conn: &SqliteConnection, connection: &Connection) -> DomainResult<()> {
    let metadata_json = serde_json::to_string(&connection.metadata)
        .map_err(|e| UnibridgeError::from(InfraError::from(e)))?;

    conn.execute(
        "INSERT INTO connections
             (id, linked_user_id, organization_id, provider, access_token,
              metadata_json, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT (id) DO UPDATE SET
             linked_user_id = excluded.linked_user_id,
             organization_id = excluded.organization_id,
             provider = excluded.provider,
             access_token = excluded.access_token,
             metadata_json = excluded.metadata_json,
             active = excluded.active",
        params![
            connection.id.to_string(),
            connection.linked_user_id,
            connection.organization_id,
            connection.provider.slug(),
            connection.access_token.as_str(),
            metadata_json,
            connection.active,
            connection.created_at.to_rfc3339(),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

struct ConnectionRow {
    id: String,
    linked_user_id: String,
    organization_id: String,
    provider: String,
    access_token: String,
    metadata_json: String,
    active: bool,
    created_at: String,
}

impl ConnectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            linked_user_id: row.get(1)?,
            organization_id: row.get(2)?,
            provider: row.get(3)?,
            access_token: row.get(4)?,
            metadata_json: row.get(5)?,
            active: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_connection(self) -> DomainResult<Connection> {
        let metadata: BTreeMap<String, String> = serde_json::from_str(&self.metadata_json)
            .map_err(|e| UnibridgeError::from(InfraError::from(e)))?;

        Ok(Connection {
            id: parse_uuid(&self.id)?,
            linked_user_id: self.linked_user_id,
            organization_id: self.organization_id,
            provider: self.provider.parse()?,
            access_token: SealedSecret::new(self.access_token),
            metadata,
            active: self.active,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
