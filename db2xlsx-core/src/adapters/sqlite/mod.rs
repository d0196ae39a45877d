//! SQLite database adapter.
//!
//! # Module Structure
//! - `connection`: File checks and read-only connection setup
//! - `type_mapping`: Storage class detection and row decoding
//!
//! # SQLite-Specific Features
//! - Values are decoded by their runtime storage class, not the declared
//!   column type, since SQLite columns may hold mixed types
//! - The database file must already exist; it is never created
//! - Single connection, opened read-only

pub mod connection;
pub mod type_mapping;

#[cfg(test)]
mod tests;

use super::helpers::open_connection;
use super::{ConnectionConfig, DatabaseAdapter};
use crate::error::Db2XlsxError;
use crate::models::{Flavour, ResultSet};
use crate::validation::ValidatedQuery;
use crate::Result;
use async_trait::async_trait;
use sqlx::{Column, Connection, Executor, SqliteConnection, Statement};
use tokio::sync::Mutex;
use tracing::debug;

// Re-export public items from submodules
pub use type_mapping::{decode_row, map_sqlite_storage_class};

/// SQLite database adapter.
pub struct SqliteAdapter {
    /// Open connection; `None` once closed
    connection: Mutex<Option<SqliteConnection>>,
    /// Connection configuration
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for SqliteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn test_connection(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(open_connection(&mut connection)?)
            .await
            .map_err(|e| Db2XlsxError::connection_failed(self.config.to_string(), e))?;

        if connectivity_result != 1 {
            return Err(Db2XlsxError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }

    async fn fetch_result_set(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        let mut connection = self.connection.lock().await;
        let connection = open_connection(&mut connection)?;

        let columns = describe_columns(connection, &query.sql).await?;
        debug!("Query returns {} columns", columns.len());

        let rows = sqlx::query(&query.sql)
            .fetch_all(&mut *connection)
            .await
            .map_err(|e| Db2XlsxError::query_error("Failed to execute query", e))?;

        let mut result = ResultSet::new(columns);
        for row in &rows {
            let cells = decode_row(row, &mut result);
            result.push_row(cells)?;
        }

        Ok(result)
    }

    fn flavour(&self) -> Flavour {
        Flavour::Sqlite
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn close(&self) {
        let Some(connection) = self.connection.lock().await.take() else {
            return;
        };
        if let Err(e) = connection.close().await {
            debug!("Error while closing the connection: {}", e);
        }
    }
}

/// Column names of the query's result, known without executing it.
async fn describe_columns(connection: &mut SqliteConnection, sql: &str) -> Result<Vec<String>> {
    let statement = connection
        .prepare(sql)
        .await
        .map_err(|e| Db2XlsxError::query_error("Failed to prepare query", e))?;

    Ok(statement
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect())
}
