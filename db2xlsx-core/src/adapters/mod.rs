//! Database adapter traits and factory for unified database access.
//!
//! This module defines the trait that every database adapter implements so the
//! pipeline can run one query against any supported flavour.
//!
//! # Module Structure
//! - `config`: Connection configuration
//! - `helpers`: Shared value conversion utilities
//! - Database-specific modules (sqlite, postgres, mysql, mssql, oracle)

use crate::models::{Flavour, ResultSet};
use crate::validation::ValidatedQuery;
use crate::Result;
use async_trait::async_trait;
use tracing::{debug, info};

// Configuration module
pub mod config;

pub use config::{CONNECT_TIMEOUT, ConnectionConfig};

/// Main trait for database adapters with object-safe design.
///
/// # Security Guarantees
/// - Only validated queries are executed
/// - Credentials are never stored in results or logged
/// - Connections are read-only where the driver allows it
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn DatabaseAdapter>`.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Runs a trivial probe query to confirm the connection is usable.
    ///
    /// # Errors
    /// Returns error if the probe fails
    async fn test_connection(&self) -> Result<()>;

    /// Executes the query once and collects every row in memory.
    ///
    /// Column names are returned even when the query yields no rows.
    ///
    /// # Errors
    /// Returns error if the query fails or a row cannot be read
    async fn fetch_result_set(&self, query: &ValidatedQuery) -> Result<ResultSet>;

    /// Returns the flavour this adapter handles.
    fn flavour(&self) -> Flavour;

    /// Gets the connection configuration (credentials sanitized in output).
    fn connection_config(&self) -> ConnectionConfig;

    /// Closes the connection gracefully.
    async fn close(&self) {}
}

/// Factory function to create a connected database adapter.
///
/// The returned adapter has already passed [`DatabaseAdapter::test_connection`],
/// so connection failures surface before any query is requested.
///
/// # Errors
/// Returns error if:
/// - The configuration is invalid
/// - A SQLite database file does not exist
/// - The flavour's driver is not compiled in
/// - The connection or probe fails
pub async fn create_adapter(config: &ConnectionConfig) -> Result<Box<dyn DatabaseAdapter>> {
    config.validate()?;
    debug!("Connecting to {}", config.redacted_target());

    let adapter: Box<dyn DatabaseAdapter> = match config.flavour {
        #[cfg(feature = "sqlite")]
        Flavour::Sqlite => Box::new(sqlite::SqliteAdapter::new(config.clone()).await?),
        #[cfg(not(feature = "sqlite"))]
        Flavour::Sqlite => {
            return Err(crate::error::Db2XlsxError::unsupported_feature(
                "SQLite adapter",
                "Compile with --features sqlite to enable SQLite support",
            ));
        }
        #[cfg(feature = "postgresql")]
        Flavour::PostgreSql => Box::new(postgres::PostgresAdapter::new(config.clone()).await?),
        #[cfg(not(feature = "postgresql"))]
        Flavour::PostgreSql => {
            return Err(crate::error::Db2XlsxError::unsupported_feature(
                "PostgreSQL adapter",
                "Compile with --features postgresql to enable PostgreSQL support",
            ));
        }
        #[cfg(feature = "mysql")]
        Flavour::MySql => Box::new(mysql::MySqlAdapter::new(config.clone()).await?),
        #[cfg(not(feature = "mysql"))]
        Flavour::MySql => {
            return Err(crate::error::Db2XlsxError::unsupported_feature(
                "MySQL adapter",
                "Compile with --features mysql to enable MySQL support",
            ));
        }
        #[cfg(feature = "mssql")]
        Flavour::MsSql => Box::new(mssql::SqlServerAdapter::new(config.clone()).await?),
        #[cfg(not(feature = "mssql"))]
        Flavour::MsSql => {
            return Err(crate::error::Db2XlsxError::unsupported_feature(
                "SQL Server adapter",
                "Compile with --features mssql to enable SQL Server support",
            ));
        }
        #[cfg(feature = "oracle")]
        Flavour::Oracle => Box::new(oracle::OracleAdapter::new(config.clone()).await?),
        #[cfg(not(feature = "oracle"))]
        Flavour::Oracle => {
            return Err(crate::error::Db2XlsxError::unsupported_feature(
                "Oracle adapter",
                "Compile with --features oracle to enable Oracle support",
            ));
        }
    };

    adapter.test_connection().await?;
    info!("Connected to {}", config);

    Ok(adapter)
}

// Shared helper utilities
pub mod helpers;

// Database-specific adapter modules
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(feature = "oracle")]
pub mod oracle;
