//! Canonical record store on SQLite
//!
//! Records are keyed by `(connection_id, object_type, remote_id)`; an upsert
//! overwrites the stored object in place and keeps its insertion position and
//! its canonical id. One canonical object may be stored once per connection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use unibridge_core::RecordStore;
use unibridge_domain::{
    CanonicalObject, CanonicalRecord, ObjectType, Result as DomainResult, UnibridgeError,
};
use uuid::Uuid;

use super::manager::{map_sql_error, run_blocking, DbManager, SqliteConnection};
use crate::errors::InfraError;

const SELECT_RECORD: &str = "SELECT object_id, connection_id, provider, remote_id, object_json,
                                    synced_at
                             FROM canonical_records";

/// SQLite-backed [`RecordStore`]
pub struct SqliteRecordStore {
    db: Arc<DbManager>,
}

impl SqliteRecordStore {
    /// Record store over the shared database.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert(&self, record: &CanonicalRecord) -> DomainResult<()> {
        let record = record.clone();
        run_blocking(&self.db, move |conn| upsert_record(conn, &record)).await
    }

    async fn find_by_remote_id(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
        remote_id: &str,
    ) -> DomainResult<Option<CanonicalRecord>> {
        let remote_id = remote_id.to_string();
        run_blocking(&self.db, move |conn| {
            let sql = format!(
                "{SELECT_RECORD} WHERE connection_id = ?1 AND object_type = ?2 AND remote_id = ?3"
            );
            conn.query_row(
                &sql,
                params![connection_id.to_string(), object_type.slug(), remote_id],
                RecordRow::from_row,
            )
            .optional()
            .map_err(map_sql_error)?
            .map(RecordRow::into_record)
            .transpose()
        })
        .await
    }

    async fn find_by_id(
        &self,
        connection_id: Uuid,
        id: Uuid,
    ) -> DomainResult<Option<CanonicalRecord>> {
        run_blocking(&self.db, move |conn| {
            let sql = format!("{SELECT_RECORD} WHERE object_id = ?1 AND connection_id = ?2");
            conn.query_row(
                &sql,
                params![id.to_string(), connection_id.to_string()],
                RecordRow::from_row,
            )
                .optional()
                .map_err(map_sql_error)?
                .map(RecordRow::into_record)
                .transpose()
        })
        .await
    }

    async fn list_by_connection(
        &self,
        connection_id: Uuid,
        object_type: ObjectType,
    ) -> DomainResult<Vec<CanonicalRecord>> {
        run_blocking(&self.db, move |conn| {
            let sql = format!(
                "{SELECT_RECORD} WHERE connection_id = ?1 AND object_type = ?2 ORDER BY rowid ASC"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params![connection_id.to_string(), object_type.slug()],
                    RecordRow::from_row,
                )
                .map_err(map_sql_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_sql_error)?;
            rows.into_iter().map(RecordRow::into_record).collect()
        })
        .await
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

/// The stored `object_id` of an existing key is never replaced; children may
/// already point at it.
fn upsert_record(conn: &SqliteConnection, record: &CanonicalRecord) -> DomainResult<()> {
    let object_json = serde_json::to_string(&record.object)
        .map_err(|e| UnibridgeError::from(InfraError::from(e)))?;

    conn.execute(
        "INSERT INTO canonical_records
             (object_id, connection_id, provider, object_type, remote_id, object_json, synced_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (connection_id, object_type, remote_id) DO UPDATE SET
             provider = excluded.provider,
             object_json = excluded.object_json,
             synced_at = excluded.synced_at",
        params![
            record.object.id.to_string(),
            record.connection_id.to_string(),
            record.provider.slug(),
            record.object_type().slug(),
            record.remote_id,
            object_json,
            record.synced_at.to_rfc3339(),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

struct RecordRow {
    object_id: String,
    connection_id: String,
    provider: String,
    remote_id: String,
    object_json: String,
    synced_at: String,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            object_id: row.get(0)?,
            connection_id: row.get(1)?,
            provider: row.get(2)?,
            remote_id: row.get(3)?,
            object_json: row.get(4)?,
            synced_at: row.get(5)?,
        })
    }

    fn into_record(self) -> DomainResult<CanonicalRecord> {
        let mut object: CanonicalObject = serde_json::from_str(&self.object_json)
            .map_err(|e| UnibridgeError::from(InfraError::from(e)))?;
        object.id = parse_uuid(&self.object_id)?;

        Ok(CanonicalRecord {
            connection_id: parse_uuid(&self.connection_id)?,
            provider: self.provider.parse()?,
            remote_id: self.remote_id,
            object,
            synced_at: parse_timestamp(&self.synced_at)?,
        })
    }
}

pub(crate) fn parse_uuid(value: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| UnibridgeError::Storage(format!("invalid stored uuid '{value}': {e}")))
}

pub(crate) fn parse_timestamp(value: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| UnibridgeError::Storage(format!("invalid stored timestamp '{value}': {e}")))
}

// ============================================================================
// Tests
// ============================================================================
