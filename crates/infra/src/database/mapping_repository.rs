//! Field mapping persistence
//!
//! At most one mapping is active per `(organization, slot, provider, object
//! type)`. A new mapping for an occupied slot deactivates the previous one in
//! the same transaction; the partial unique index backs this up.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, Transaction, TransactionBehavior};
use tracing::debug;
use unibridge_core::MappingRepository;
use unibridge_domain::{AdapterKey, FieldMapping, Result as DomainResult};
use uuid::Uuid;

use super::manager::{map_sql_error, run_blocking, DbManager, SqliteConnection};
use super::record_repository::{parse_timestamp, parse_uuid};

const SELECT_MAPPING: &str = "SELECT id, organization_id, standard_slot, provider, object_type,
                                     remote_field_id, data_type, direction, active, created_at
                              FROM field_mappings";

/// SQLite-backed [`MappingRepository`]
pub struct SqliteMappingRepository {
    db: Arc<DbManager>,
}

impl SqliteMappingRepository {
    /// Mapping repository over the shared database.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MappingRepository for SqliteMappingRepository {
    async fn list_active(&self, organization_id: &str) -> DomainResult<Vec<FieldMapping>> {
        let organization_id = organization_id.to_string();
        run_blocking(&self.db, move |conn| {
            let sql = format!(
                "{SELECT_MAPPING} WHERE organization_id = ?1 AND active = 1 ORDER BY created_at ASC"
            );
            query_mappings(conn, &sql, params![organization_id])
        })
        .await
    }

    async fn list_mappings(
        &self,
        organization_id: &str,
        key: AdapterKey,
    ) -> DomainResult<Vec<FieldMapping>> {
        let organization_id = organization_id.to_string();
        run_blocking(&self.db, move |conn| {
            let sql = format!(
                "{SELECT_MAPPING}
                 WHERE organization_id = ?1 AND provider = ?2 AND object_type = ?3 AND active = 1
                 ORDER BY created_at ASC"
            );
            query_mappings(
                conn,
                &sql,
                params![organization_id, key.provider.slug(), key.object_type.slug()],
            )
        })
        .await
    }

    async fn upsert_superseding(
        &self,
        mapping: &FieldMapping,
    ) -> DomainResult<Option<FieldMapping>> {
        mapping.validate()?;
        let mapping = mapping.clone();
        run_blocking(&self.db, move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;
            let superseded = supersede_active(&tx, &mapping)?;
            insert_mapping(&tx, &mapping)?;
            tx.commit().map_err(map_sql_error)?;

            if let Some(previous) = &superseded {
                debug!(
                    organization_id = %mapping.organization_id,
                    slot = %mapping.standard_slot,
                    previous = %previous.id,
                    "field mapping superseded"
                );
            }
            Ok(superseded)
        })
        .await
    }

    async fn deactivate(&self, organization_id: &str, id: Uuid) -> DomainResult<bool> {
        let organization_id = organization_id.to_string();
        run_blocking(&self.db, move |conn| {
            let changed = conn
                .execute(
                    "UPDATE field_mappings SET active = 0
                     WHERE id = ?1 AND organization_id = ?2 AND active = 1",
                    params![id.to_string(), organization_id],
                )
                .map_err(map_sql_error)?;
            Ok(changed > 0)
        })
        .await
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

fn query_mappings(
    conn: &SqliteConnection,
    sql: &str,
    args: impl rusqlite::Params,
) -> DomainResult<Vec<FieldMapping>> {
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(args, MappingRow::from_row)
        .map_err(map_sql_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sql_error)?;
    rows.into_iter().map(MappingRow::into_mapping).collect()
}

fn supersede_active(
    tx: &Transaction<'_>,
    mapping: &FieldMapping,
) -> DomainResult<Option<FieldMapping>> {
    let sql = format!(
        "{SELECT_MAPPING}
         WHERE organization_id = ?1 AND standard_slot = ?2 AND provider = ?3
           AND object_type = ?4 AND active = 1"
    );
    let previous = tx
        .query_row(
            &sql,
            params![
                mapping.organization_id,
                mapping.standard_slot,
                mapping.provider.slug(),
                mapping.object_type.slug(),
            ],
            MappingRow::from_row,
        )
        .optional()
        .map_err(map_sql_error)?
        .map(MappingRow::into_mapping)
        .transpose()?;

    let Some(mut previous) = previous else {
        return Ok(None);
    };

    tx.execute(
        "UPDATE field_mappings SET active = 0 WHERE id = ?1",
        params![previous.id.to_string()],
    )
    .map_err(map_sql_error)?;
    previous.active = false;
    Ok(Some(previous))
}

fn insert_mapping(tx: &Transaction<'_>, mapping: &FieldMapping) -> DomainResult<()> {
    tx.execute(
        "INSERT INTO field_mappings
             (id, organization_id, standard_slot, provider, object_type,
              remote_field_id, data_type, direction, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            mapping.id.to_string(),
            mapping.organization_id,
            mapping.standard_slot,
            mapping.provider.slug(),
            mapping.object_type.slug(),
            mapping.remote_field_id,
            mapping.data_type.as_str(),
            mapping.direction.as_str(),
            mapping.active,
            mapping.created_at.to_rfc3339(),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

struct MappingRow {
    id: String,
    organization_id: String,
    standard_slot: String,
    provider: String,
    object_type: String,
    remote_field_id: String,
    data_type: String,
    direction: String,
    active: bool,
    created_at: String,
}

impl MappingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            standard_slot: row.get(2)?,
            provider: row.get(3)?,
            object_type: row.get(4)?,
            remote_field_id: row.get(5)?,
            data_type: row.get(6)?,
            direction: row.get(7)?,
            active: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_mapping(self) -> DomainResult<FieldMapping> {
        Ok(FieldMapping {
            id: parse_uuid(&self.id)?,
            organization_id: self.organization_id,
            standard_slot: self.standard_slot,
            provider: self.provider.parse()?,
            object_type: self.object_type.parse()?,
            remote_field_id: self.remote_field_id,
            data_type: self.data_type.parse()?,
            direction: self.direction.parse()?,
            active: self.active,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
