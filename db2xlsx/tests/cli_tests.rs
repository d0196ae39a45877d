//! End-to-end tests of the export pipeline with scripted operator input.
//!
//! These tests verify that:
//! - A valid query produces a workbook with every row and header
//! - Rejected queries are re-prompted and never executed
//! - Missing database files and failing queries leave no workbook behind

#![cfg(feature = "sqlite")]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use calamine::{Data, Reader, open_workbook_auto};
use clap::Parser;
use db2xlsx::{Cli, PASSWORD_ENV, QUERY_PROMPT, run};
use db2xlsx_core::Db2XlsxError;
use sqlx::sqlite::SqliteConnectOptions;
use std::io::Cursor;
use std::path::Path;

async fn create_inventory_db(path: &Path) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = sqlx::SqlitePool::connect_with(options).await.unwrap();

    sqlx::query("CREATE TABLE inventory (sku TEXT, qty INTEGER, price REAL, note TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO inventory VALUES
            ('A-100', 4, 2.5, 'front shelf'),
            ('B-200', 0, 10.0, NULL),
            ('C-300', 12, 0.75, 'backorder')",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool.close().await;
}

fn cli(db_path: &Path, output_dir: &Path, extra: &[&str]) -> Cli {
    let db = db_path.to_string_lossy().into_owned();
    let out = output_dir.to_string_lossy().into_owned();
    let mut args = vec!["db2xlsx", "-f", "sqlite", "-d", &db, "-o", &out];
    args.extend_from_slice(extra);

    temp_env::with_var(PASSWORD_ENV, None::<&str>, || {
        Cli::try_parse_from(args).expect("arguments should parse")
    })
}

async fn run_scripted(cli: &Cli, script: &str) -> (anyhow::Result<db2xlsx_core::ExportSummary>, String) {
    let mut input = Cursor::new(script.as_bytes().to_vec());
    let mut output = Vec::new();
    let result = run(cli, None, &mut input, &mut output).await;
    (result, String::from_utf8(output).unwrap())
}

fn read_sheet(path: &Path) -> (String, Vec<Vec<Data>>) {
    let mut workbook = open_workbook_auto(path).unwrap();
    let (name, range) = workbook.worksheets().remove(0);
    (name, range.rows().map(<[Data]>::to_vec).collect())
}

#[tokio::test]
async fn test_integration_prompted_query_is_exported() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;
    let out = dir.path().join("excel_files");

    let cli = cli(&db_path, &out, &[]);
    let (result, console) = run_scripted(&cli, "SELECT * FROM inventory\n").await;

    let summary = result.unwrap();
    assert_eq!(summary.path, out.join("stock.xlsx"));
    assert_eq!(summary.rows_written, 3);

    assert!(console.starts_with("Connected to SQLite Database!\n"));
    assert!(console.contains(QUERY_PROMPT));
    assert!(console.contains("Success! Excel files have been written."));

    let (sheet, rows) = read_sheet(&summary.path);
    assert_eq!(sheet, "inventory");
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        vec![
            Data::String("sku".to_string()),
            Data::String("qty".to_string()),
            Data::String("price".to_string()),
            Data::String("note".to_string()),
        ]
    );
    assert_eq!(rows[1][0], Data::String("A-100".to_string()));
    assert_eq!(rows[2][3], Data::Empty);
    assert_eq!(rows[3][2], Data::Float(0.75));
}

#[tokio::test]
async fn test_integration_rejected_queries_are_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(&db_path, dir.path(), &[]);
    let script = "DELETE FROM inventory\nDROP TABLE inventory\nselect sku from inventory\n";
    let (result, console) = run_scripted(&cli, script).await;

    assert_eq!(result.unwrap().rows_written, 3);
    assert_eq!(console.matches(QUERY_PROMPT).count(), 3);
    assert_eq!(
        console
            .matches("Not a SELECT Query. Only SELECT Queries are permitted.")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_integration_end_of_input_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;
    let out = dir.path().join("excel_files");

    let cli = cli(&db_path, &out, &[]);
    let (result, _) = run_scripted(&cli, "UPDATE inventory SET qty = 0\n").await;

    let error = result.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<Db2XlsxError>(),
        Some(Db2XlsxError::Cancelled)
    ));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_integration_missing_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nowhere.db");
    let out = dir.path().join("excel_files");

    let cli = cli(&db_path, &out, &[]);
    let (result, console) = run_scripted(&cli, "SELECT * FROM inventory\n").await;

    assert!(matches!(
        result.unwrap_err().downcast_ref::<Db2XlsxError>(),
        Some(Db2XlsxError::DatabaseNotFound { .. })
    ));
    assert_eq!(console, "Database does not exist\n");
    assert!(!db_path.exists());
    assert!(!out.exists());
}

#[tokio::test]
async fn test_integration_query_flag_skips_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(
        &db_path,
        dir.path(),
        &["-q", "SELECT qty, sku FROM inventory WHERE qty > 0 ORDER BY qty"],
    );
    let (result, console) = run_scripted(&cli, "").await;

    let summary = result.unwrap();
    assert!(!console.contains(QUERY_PROMPT));

    let (_, rows) = read_sheet(&summary.path);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Data::String("qty".to_string()));
    assert_eq!(rows[1][0], Data::Float(4.0));
    assert_eq!(rows[2][1], Data::String("C-300".to_string()));
}

#[tokio::test]
async fn test_integration_invalid_query_flag_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(&db_path, dir.path(), &["-q", "DELETE FROM inventory"]);
    let (result, console) = run_scripted(&cli, "SELECT * FROM inventory\n").await;

    assert!(matches!(
        result.unwrap_err().downcast_ref::<Db2XlsxError>(),
        Some(Db2XlsxError::InvalidQuery(_))
    ));
    assert!(!console.contains(QUERY_PROMPT));
    assert!(!dir.path().join("stock.xlsx").exists());
}

#[tokio::test]
async fn test_integration_failing_query_reports_invalid_sql() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(&db_path, dir.path(), &[]);
    let (result, console) = run_scripted(&cli, "SELECT * FROM no_such_table\n").await;

    assert!(matches!(
        result.unwrap_err().downcast_ref::<Db2XlsxError>(),
        Some(Db2XlsxError::QueryExecution { .. })
    ));
    assert!(console.contains("Not a valid SQL Query"));
    assert!(!dir.path().join("stock.xlsx").exists());
}

#[tokio::test]
async fn test_integration_empty_result_writes_headers() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(
        &db_path,
        dir.path(),
        &["-q", "SELECT sku, qty FROM inventory WHERE qty > 1000"],
    );
    let (result, _) = run_scripted(&cli, "").await;

    let summary = result.unwrap();
    assert_eq!(summary.rows_written, 0);

    let (_, rows) = read_sheet(&summary.path);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0],
        vec![
            Data::String("sku".to_string()),
            Data::String("qty".to_string())
        ]
    );
}

#[tokio::test]
async fn test_integration_lenient_policy_accepts_cte() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("stock.sqlite");
    create_inventory_db(&db_path).await;

    let cli = cli(&db_path, dir.path(), &["--query-policy", "lenient"]);
    let script = "WITH stocked AS (SELECT * FROM inventory WHERE qty > 0) SELECT sku FROM stocked\n";
    let (result, _) = run_scripted(&cli, script).await;

    let summary = result.unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.sheet_name, "inventory");
}
