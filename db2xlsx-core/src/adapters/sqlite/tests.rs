//! Unit tests for SQLite adapter.
//!
//! These tests verify the SQLite adapter functionality including:
//! - Storage class mapping
//! - Decoding of mixed-type columns
//! - Read-only behaviour and missing-file handling

#![allow(clippy::unwrap_used)]

use crate::adapters::helpers::ValueKind;
use crate::adapters::{ConnectionConfig, DatabaseAdapter};
use crate::error::Db2XlsxError;
use crate::models::{CellValue, Flavour};
use crate::validation::{QueryPolicy, validate_query};

use super::SqliteAdapter;
use super::type_mapping::map_sqlite_storage_class;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::Path;

// =============================================================================
// Type Mapping Tests
// =============================================================================

#[test]
fn test_map_sqlite_storage_classes() {
    let test_cases = [
        ("INTEGER", ValueKind::Int),
        ("REAL", ValueKind::Float),
        ("TEXT", ValueKind::Text),
        ("BLOB", ValueKind::Bytes),
        ("NUMERIC", ValueKind::Decimal),
        ("BOOLEAN", ValueKind::Bool),
        ("DATETIME", ValueKind::Other),
    ];

    for (name, expected) in test_cases {
        assert_eq!(map_sqlite_storage_class(name), expected, "Failed for {}", name);
    }
}

// =============================================================================
// Adapter Tests
// =============================================================================

async fn create_fixture(path: &Path) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await.unwrap();

    sqlx::query(
        "CREATE TABLE mixed (id INTEGER PRIMARY KEY, label TEXT, score REAL, payload BLOB, anything)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO mixed (id, label, score, payload, anything) VALUES \
         (1, 'alpha', 1.5, x'DEADBEEF', 42), \
         (2, NULL, NULL, NULL, 'text in an untyped column'), \
         (3, 'gamma', -0.25, x'', 3.75)",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool.close().await;
}

#[tokio::test]
async fn test_missing_file_is_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let result = SqliteAdapter::new(config).await;

    assert!(matches!(result, Err(Db2XlsxError::DatabaseNotFound { .. })));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_fetch_decodes_mixed_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.db");
    create_fixture(&path).await;

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let adapter = SqliteAdapter::new(config).await.unwrap();
    adapter.test_connection().await.unwrap();

    let query = validate_query("SELECT * FROM mixed ORDER BY id", QueryPolicy::Strict).unwrap();
    let result = adapter.fetch_result_set(&query).await.unwrap();

    assert_eq!(
        result.columns,
        vec!["id", "label", "score", "payload", "anything"]
    );
    assert_eq!(result.row_count(), 3);
    assert!(result.warnings.is_empty());

    assert_eq!(
        result.rows[0],
        vec![
            CellValue::Int(1),
            CellValue::Text("alpha".to_string()),
            CellValue::Float(1.5),
            CellValue::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            CellValue::Int(42),
        ]
    );
    assert_eq!(result.rows[1][1], CellValue::Null);
    assert_eq!(
        result.rows[1][4],
        CellValue::Text("text in an untyped column".to_string())
    );
    assert_eq!(result.rows[2][4], CellValue::Float(3.75));

    adapter.close().await;
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.db");
    create_fixture(&path).await;

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let adapter = SqliteAdapter::new(config).await.unwrap();

    let query =
        validate_query("SELECT id, label FROM mixed WHERE id < 0", QueryPolicy::Strict).unwrap();
    let result = adapter.fetch_result_set(&query).await.unwrap();

    assert_eq!(result.columns, vec!["id", "label"]);
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_connection_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readonly.db");
    create_fixture(&path).await;

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let adapter = SqliteAdapter::new(config).await.unwrap();

    let mut connection = adapter.connection.lock().await;
    let write = sqlx::query("DELETE FROM mixed")
        .execute(connection.as_mut().unwrap())
        .await;
    assert!(write.is_err());
}

#[tokio::test]
async fn test_query_error_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.db");
    create_fixture(&path).await;

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let adapter = SqliteAdapter::new(config).await.unwrap();

    let query = validate_query("SELECT * FROM no_such_table", QueryPolicy::Strict).unwrap();
    let result = adapter.fetch_result_set(&query).await;
    assert!(matches!(result, Err(Db2XlsxError::QueryExecution { .. })));
}

#[tokio::test]
async fn test_fetch_after_close_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("closed.db");
    create_fixture(&path).await;

    let config = ConnectionConfig::new(Flavour::Sqlite, path.to_string_lossy());
    let adapter = SqliteAdapter::new(config).await.unwrap();
    adapter.close().await;
    adapter.close().await;

    let query = validate_query("SELECT * FROM mixed", QueryPolicy::Strict).unwrap();
    let result = adapter.fetch_result_set(&query).await;
    assert!(matches!(result, Err(Db2XlsxError::Configuration { .. })));
}
