//! Persistence across database reopen

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::Arc;

use chrono::Utc;
use support::{TestDatabase, ORG};
use unibridge_core::{ConnectionRepository, FieldMappingStore, RecordStore};
use unibridge_domain::{
    AdapterKey, CanonicalFields, CanonicalObject, CanonicalRecord, FieldMapping, ObjectType,
    Provider, UnifiedContact,
};
use unibridge_infra::database::{
    DbManager, SqliteConnectionRepository, SqliteMappingRepository, SqliteRecordStore,
};

const CONTACTS: AdapterKey = AdapterKey::new(Provider::Freshsales, ObjectType::Contact);

fn reopen(db: &TestDatabase) -> Arc<DbManager> {
    let manager = DbManager::new(db.manager.path(), 2).expect("database should reopen");
    manager.run_migrations().expect("migrations are idempotent");
    Arc::new(manager)
}

#[tokio::test(flavor = "multi_thread")]
async fn mappings_are_reloaded_by_a_fresh_store() {
    let db = TestDatabase::new();
    let store = FieldMappingStore::with_repository(Arc::new(SqliteMappingRepository::new(
        Arc::clone(&db.manager),
    )));
    store.upsert(FieldMapping::new(ORG, "tier", CONTACTS, "cf_tier")).await.unwrap();
    store.upsert(FieldMapping::new(ORG, "tier", CONTACTS, "cf_level")).await.unwrap();
    store.upsert(FieldMapping::new(ORG, "region", CONTACTS, "cf_region")).await.unwrap();

    let reopened = reopen(&db);
    let fresh =
        FieldMappingStore::with_repository(Arc::new(SqliteMappingRepository::new(reopened)));
    assert!(fresh.snapshot(ORG).is_empty());
    assert!(fresh.loaded_snapshot(ORG).is_err());

    let snapshot = fresh.ensure_loaded(ORG).await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.slot_for_remote(CONTACTS, "cf_level"), Some("tier"));
    assert_eq!(snapshot.slot_for_remote(CONTACTS, "cf_tier"), None);
    assert_eq!(fresh.hydrate("org-other").await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn connections_and_records_survive_reopen() {
    let db = TestDatabase::new();
    let decryptor = support::decryptor();
    let connection =
        support::connection(&decryptor, Provider::Freshsales, "fs-token", "https://acme.example");

    SqliteConnectionRepository::new(Arc::clone(&db.manager)).save(&connection).await.unwrap();
    let object = CanonicalObject::new(CanonicalFields::Contact(UnifiedContact {
        email_address: Some("jane@example.com".into()),
        ..UnifiedContact::default()
    }))
    .with_remote_id("31001")
    .with_field("tier", "gold");
    let record = CanonicalRecord {
        connection_id: connection.id,
        provider: Provider::Freshsales,
        remote_id: "31001".into(),
        object,
        synced_at: Utc::now(),
    };
    SqliteRecordStore::new(Arc::clone(&db.manager)).upsert(&record).await.unwrap();

    let reopened = reopen(&db);
    let connections = SqliteConnectionRepository::new(Arc::clone(&reopened));
    let stored = connections.find(connection.id).await.unwrap().expect("connection persisted");
    assert_eq!(stored.access_token, connection.access_token);
    assert_eq!(stored.metadata, connection.metadata);
    assert_eq!(connections.list_active().await.unwrap().len(), 1);

    let records = SqliteRecordStore::new(reopened);
    let found = records
        .find_by_remote_id(connection.id, ObjectType::Contact, "31001")
        .await
        .unwrap()
        .expect("record persisted");
    assert_eq!(found.object.id, record.object.id);
    assert_eq!(found.object.field_mappings, record.object.field_mappings);
    let by_id = records.find_by_id(connection.id, record.object.id).await.unwrap();
    assert_eq!(by_id.map(|r| r.remote_id).as_deref(), Some("31001"));
}
