//! PostgreSQL database adapter.
//!
//! # Module Structure
//! - `connection`: Connection options and read-only session setup
//! - `type_mapping`: PostgreSQL type detection and row decoding
//!
//! # Security Guarantees
//! - Sessions default to read-only transactions
//! - Credentials are never included in error messages

mod connection;
mod type_mapping;

#[cfg(test)]
mod tests;

use super::helpers::open_connection;
use super::{ConnectionConfig, DatabaseAdapter};
use crate::Result;
use crate::error::Db2XlsxError;
use crate::models::{Flavour, ResultSet};
use crate::validation::ValidatedQuery;
use async_trait::async_trait;
use sqlx::{Column, Connection, Executor, PgConnection, Statement};
use tokio::sync::Mutex;
use tracing::debug;

// Re-export public items from submodules
pub use connection::build_connect_options;
pub use type_mapping::{decode_row, map_postgresql_type};

/// PostgreSQL database adapter.
pub struct PostgresAdapter {
    /// Open connection; `None` once closed
    connection: Mutex<Option<PgConnection>>,
    /// Connection configuration
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
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

        let statement = connection
            .prepare(&query.sql)
            .await
            .map_err(|e| Db2XlsxError::query_error("Failed to prepare query", e))?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();
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
        Flavour::PostgreSql
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
