//! Oracle database adapter.
//!
//! The `oracle` crate is synchronous and links against Oracle Instant Client,
//! so every call runs on tokio's blocking thread pool.

use super::helpers::undecodable;
use super::{ConnectionConfig, DatabaseAdapter};
use crate::Result;
use crate::error::Db2XlsxError;
use crate::models::{CellValue, Flavour, ResultSet};
use crate::validation::ValidatedQuery;
use async_trait::async_trait;
use oracle::sql_type::OracleType;
use oracle::{Connection, SqlValue};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Oracle adapter holding a single connection.
pub struct OracleAdapter {
    connection: Arc<Mutex<Connection>>,
    config: ConnectionConfig,
}

impl std::fmt::Debug for OracleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Easy Connect string (`//host:port/service`) for the configured target.
pub fn connect_string(config: &ConnectionConfig) -> String {
    format!(
        "//{}:{}/{}",
        config.host,
        config.effective_port().unwrap_or(1521),
        config.database
    )
}

impl OracleAdapter {
    /// Connects to the Oracle service described by `config`.
    ///
    /// # Errors
    /// Returns error if the client libraries are missing or the login fails
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let username = config.username.clone().unwrap_or_default();
        let password = zeroize::Zeroizing::new(config.password().unwrap_or_default().to_string());
        let target = connect_string(&config);
        let context = config.to_string();

        let connection = tokio::task::spawn_blocking(move || {
            Connection::connect(&username, password.as_str(), &target)
                .map_err(|e| Db2XlsxError::connection_failed(context, e))
        })
        .await
        .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))??;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            config,
        })
    }

    async fn run_blocking<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .map_err(|_| Db2XlsxError::query_failed("Oracle connection lock poisoned"))?;
            operation(&guard)
        })
        .await
        .map_err(|e| Db2XlsxError::query_error("Oracle worker task failed", e))?
    }
}

#[async_trait]
impl DatabaseAdapter for OracleAdapter {
    async fn test_connection(&self) -> Result<()> {
        let context = self.config.to_string();
        let value = self
            .run_blocking(move |conn| {
                conn.query_row_as::<i64>("SELECT 1 FROM DUAL", &[])
                    .map_err(|e| Db2XlsxError::connection_failed(context, e))
            })
            .await?;

        if value != 1 {
            return Err(Db2XlsxError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }

    async fn fetch_result_set(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        let sql = query.sql.clone();
        let result = self
            .run_blocking(move |conn| {
                let rows = conn
                    .query(&sql, &[])
                    .map_err(|e| Db2XlsxError::query_error("Failed to execute query", e))?;

                let column_types: Vec<(String, OracleType)> = rows
                    .column_info()
                    .iter()
                    .map(|info| (info.name().to_string(), info.oracle_type().clone()))
                    .collect();
                let mut result =
                    ResultSet::new(column_types.iter().map(|(name, _)| name.clone()).collect());

                for row in rows {
                    let row =
                        row.map_err(|e| Db2XlsxError::query_error("Failed to fetch row", e))?;
                    let cells = row
                        .sql_values()
                        .iter()
                        .zip(&column_types)
                        .map(|(value, (name, oracle_type))| {
                            decode_value(value, name, oracle_type, &mut result)
                        })
                        .collect();
                    result.push_row(cells)?;
                }

                Ok(result)
            })
            .await?;

        debug!("Fetched {} rows from Oracle", result.row_count());
        Ok(result)
    }

    fn flavour(&self) -> Flavour {
        Flavour::Oracle
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}

fn decode_value(
    value: &SqlValue,
    column: &str,
    oracle_type: &OracleType,
    result: &mut ResultSet,
) -> CellValue {
    match value.is_null() {
        Ok(true) => return CellValue::Null,
        Ok(false) => {}
        Err(e) => return undecodable(result, column, &oracle_type.to_string(), e),
    }

    let decoded = match oracle_type {
        OracleType::Number(precision, 0) if (1..=18).contains(precision) => {
            value.get::<i64>().map(CellValue::Int)
        }
        OracleType::Int64 => value.get::<i64>().map(CellValue::Int),
        OracleType::Number(..)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble => value.get::<f64>().map(CellValue::Float),
        OracleType::Boolean => value.get::<bool>().map(CellValue::Bool),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => {
            value.get::<Vec<u8>>().map(CellValue::Bytes)
        }
        _ => value.get::<String>().map(CellValue::Text),
    };

    decoded.unwrap_or_else(|e| undecodable(result, column, &oracle_type.to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_string() {
        let config = ConnectionConfig::new(Flavour::Oracle, "ORCLPDB1").with_host("ora.internal");
        assert_eq!(connect_string(&config), "//ora.internal:1521/ORCLPDB1");

        let config = config.with_port(1522);
        assert_eq!(connect_string(&config), "//ora.internal:1522/ORCLPDB1");
    }
}
