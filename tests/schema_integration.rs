//! Schema Integration Tests
//!
//! Table creation, column introspection and DDL catalog discovery through the
//! public API.

use quantum_ts::{
    config::{Config, NodeDescriptor},
    engine::{InMemoryStore, TableEngine},
    error::{DecodeError, Error, SchemaError},
    schema::{self, catalog},
    Field, FieldType, QuantizedField, TableDefinition, TimeUnit, Value,
};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn geo_checkin() -> TableDefinition {
    TableDefinition::new(
        "GeoCheckin",
        QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap(),
        vec![
            Field::varchar("region").not_null(),
            Field::varchar("state").not_null(),
        ],
        vec![
            Field::new("weather", FieldType::Varchar),
            Field::new("temperature", FieldType::Double),
        ],
    )
    .unwrap()
}

fn describe_row(name: &str, ty: &str, nullable: i64, pk: i64, lk: i64) -> Vec<Value> {
    vec![name.into(), ty.into(), nullable.into(), pk.into(), lk.into()]
}

// =============================================================================
// Table Creation
// =============================================================================

#[tokio::test]
async fn test_create_geo_checkin() {
    let store = Arc::new(InMemoryStore::new());
    let engine = TableEngine::new(store.clone());

    let statement = engine.create_table(&geo_checkin()).await.unwrap();
    assert_eq!(
        statement,
        "CREATE TABLE GeoCheckin (region VARCHAR NOT NULL, state VARCHAR NOT NULL, \
         time TIMESTAMP NOT NULL, weather VARCHAR NULL, temperature DOUBLE NULL, \
         PRIMARY KEY ((region, state, QUANTUM(time, 15, 'm')), region, state, time))"
    );
    assert!(store.has_table("GeoCheckin"));
    assert_eq!(store.stats().ddl_executed, 1);
}

#[tokio::test]
async fn test_create_same_table_twice_is_rejected() {
    let engine = TableEngine::new(Arc::new(InMemoryStore::new()));
    engine.create_table(&geo_checkin()).await.unwrap();
    assert!(matches!(engine.create_table(&geo_checkin()).await, Err(Error::Store(_))));
}

#[test]
fn test_nullable_key_field_rejected_at_construction() {
    let result = TableDefinition::new(
        "t",
        QuantizedField::new("ts", FieldType::Timestamp, 1, TimeUnit::Days).unwrap(),
        vec![Field::varchar("host")],
        vec![],
    );
    assert_eq!(result.unwrap_err(), SchemaError::NullablePrimaryKey("host".to_string()));
}

#[test]
fn test_hand_assembled_definition_rechecked_by_compiler() {
    let mut def = geo_checkin();
    def.quantized_field.field.nullable = true;
    assert_eq!(
        schema::compile_create_table(&def),
        Err(SchemaError::NullablePrimaryKey("time".to_string()))
    );
}

#[test]
fn test_zero_bucket_size_rejected() {
    assert!(matches!(
        QuantizedField::new("ts", FieldType::Timestamp, 0, TimeUnit::Seconds),
        Err(SchemaError::InvalidBucketSize { size: 0, .. })
    ));
}

// =============================================================================
// Column Introspection
// =============================================================================

#[tokio::test]
async fn test_list_columns_inverted_flags() {
    let store = Arc::new(InMemoryStore::new());
    store.create_table(
        "GeoCheckin",
        vec![
            describe_row("region", "varchar", 1, 0, 0),
            describe_row("time", "timestamp", 1, 0, 0),
            describe_row("amount", "double", 0, 1, 1),
        ],
    );
    let engine = TableEngine::new(store);

    let columns = engine.list_columns("GeoCheckin").await.unwrap();
    assert_eq!(columns.len(), 3);

    let amount = &columns["amount"];
    assert_eq!(amount.column_type, "double");
    assert!(amount.nullable);
    assert!(!amount.is_primary_key);
    assert!(!amount.is_local_key);

    let region = &columns["region"];
    assert!(!region.nullable);
    assert!(region.is_primary_key);
    assert!(region.is_local_key);
}

#[tokio::test]
async fn test_list_columns_short_rows_default_to_true() {
    let store = Arc::new(InMemoryStore::new());
    store.create_table("t", vec![vec!["host".into(), "varchar".into()]]);
    let engine = TableEngine::new(store);

    let host = &engine.list_columns("t").await.unwrap()["host"];
    assert!(host.nullable && host.is_primary_key && host.is_local_key);
}

#[tokio::test]
async fn test_list_columns_malformed_row() {
    let store = Arc::new(InMemoryStore::new());
    store.create_table("t", vec![describe_row("ok", "varchar", 0, 0, 0), vec!["only_name".into()]]);
    let engine = TableEngine::new(store);

    assert!(matches!(
        engine.list_columns("t").await,
        Err(Error::Decode(DecodeError::MissingField { row: 1, field: "type" }))
    ));
}

// =============================================================================
// DDL Catalog
// =============================================================================

#[tokio::test]
async fn test_list_tables_from_node_directory() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let ddl_dir = root.path().join(catalog::DDL_DIR);
    std::fs::create_dir_all(&ddl_dir).unwrap();
    for file in [
        "riak_ql_table_GeoCheckin$1.beam",
        "riak_ql_table_GeoCheckin$2.beam",
        "riak_ql_table_Alerts$1.beam",
        "README",
    ] {
        std::fs::write(ddl_dir.join(file), b"").unwrap();
    }

    let node = NodeDescriptor {
        name: "devA".to_string(),
        pb_host_port: "127.0.0.1:10017".to_string(),
        rel_path: root.path().to_string_lossy().to_string(),
    };
    let tables = schema::list_tables(&node).await.unwrap();
    assert_eq!(tables, vec!["Alerts".to_string(), "GeoCheckin".to_string()]);
}

#[tokio::test]
async fn test_list_tables_missing_directory() {
    let root = TempDir::new().expect("Failed to create temp dir");
    let mut config = Config::default();
    config.store.nodes[0].rel_path = root.path().join("absent").to_string_lossy().to_string();

    let node = config.any_node().unwrap();
    assert!(matches!(schema::list_tables(node).await, Err(Error::Io(_))));
}
