//! Unit tests for PostgreSQL adapter.

use super::*;
use crate::adapters::helpers::ValueKind;

#[test]
fn test_map_postgresql_types() {
    let test_cases = [
        ("BOOL", ValueKind::Bool),
        ("INT2", ValueKind::Int),
        ("INT8", ValueKind::Int),
        ("FLOAT4", ValueKind::Float),
        ("NUMERIC", ValueKind::Decimal),
        ("DATE", ValueKind::Date),
        ("TIMESTAMP", ValueKind::DateTime),
        ("TIMESTAMPTZ", ValueKind::DateTimeTz),
        ("UUID", ValueKind::Uuid),
        ("JSONB", ValueKind::Json),
        ("BYTEA", ValueKind::Bytes),
        ("VARCHAR", ValueKind::Text),
        ("INTERVAL", ValueKind::Other),
        ("my_enum", ValueKind::Other),
    ];

    for (name, expected) in test_cases {
        assert_eq!(map_postgresql_type(name), expected, "Failed for {}", name);
    }
}

#[test]
fn test_connect_options_from_config() {
    let config = ConnectionConfig::new(Flavour::PostgreSql, "sales")
        .with_host("db.internal")
        .with_port(6543)
        .with_username("report")
        .with_password("secret");

    let options = build_connect_options(&config);
    assert_eq!(options.get_host(), "db.internal");
    assert_eq!(options.get_port(), 6543);
    assert_eq!(options.get_database(), Some("sales"));
    assert_eq!(options.get_username(), "report");
    assert!(
        options
            .get_options()
            .is_some_and(|o| o.contains("default_transaction_read_only"))
    );
}

#[test]
fn test_connect_options_default_port() {
    let config = ConnectionConfig::new(Flavour::PostgreSql, "sales");
    let options = build_connect_options(&config);
    assert_eq!(options.get_port(), 5432);
}

#[tokio::test]
async fn test_connection_refused_is_connection_error() {
    // Port 1 is reserved and nothing listens there in CI
    let config = ConnectionConfig::new(Flavour::PostgreSql, "postgres")
        .with_port(1)
        .with_connect_timeout(std::time::Duration::from_secs(2));

    let result = PostgresAdapter::new(config).await;
    assert!(matches!(result, Err(Db2XlsxError::Connection { .. })));
}

#[tokio::test]
async fn test_connection_refused_fails_without_retrying() {
    // Default connect timeout; a refused connection must not wait it out
    let config = ConnectionConfig::new(Flavour::PostgreSql, "postgres")
        .with_host("127.0.0.1")
        .with_port(1);
    assert_eq!(config.connect_timeout, crate::adapters::CONNECT_TIMEOUT);

    let started = std::time::Instant::now();
    let result = PostgresAdapter::new(config).await;

    assert!(matches!(result, Err(Db2XlsxError::Connection { .. })));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
