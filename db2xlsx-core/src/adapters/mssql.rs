//! SQL Server database adapter.
//!
//! Uses `tiberius` over a tokio TCP stream. SQL Server has no read-only
//! session switch comparable to PostgreSQL's, so the login's permissions are
//! the only write protection beyond query validation.

use super::helpers::{format_datetime, text_cell, undecodable};
use super::{ConnectionConfig, DatabaseAdapter};
use crate::Result;
use crate::error::Db2XlsxError;
use crate::models::{CellValue, Flavour, ResultSet};
use crate::validation::ValidatedQuery;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

type SqlServerClient = Client<Compat<TcpStream>>;

/// SQL Server adapter holding a single client connection.
pub struct SqlServerAdapter {
    client: Mutex<SqlServerClient>,
    config: ConnectionConfig,
}

impl std::fmt::Debug for SqlServerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlServerAdapter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SqlServerAdapter {
    /// Connects to the SQL Server instance described by `config`.
    ///
    /// # Security
    /// - Credentials are consumed during connection establishment
    /// - All errors carry the credential-free connection description
    ///
    /// # Errors
    /// Returns an error if the connection cannot be established within the
    /// configured timeout
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let tiberius_config = build_tiberius_config(&config);

        let connect = async {
            let tcp = TcpStream::connect(tiberius_config.get_addr())
                .await
                .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))?;
            tcp.set_nodelay(true)
                .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))?;

            Client::connect(tiberius_config.clone(), tcp.compat_write())
                .await
                .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))
        };

        let client = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))??;

        Ok(Self {
            client: Mutex::new(client),
            config,
        })
    }
}

/// Maps a [`ConnectionConfig`] onto a `tiberius` configuration.
pub fn build_tiberius_config(config: &ConnectionConfig) -> Config {
    let mut tiberius_config = Config::new();
    tiberius_config.host(&config.host);
    tiberius_config.port(config.effective_port().unwrap_or(1433));
    tiberius_config.database(&config.database);
    tiberius_config.application_name("db2xlsx");
    tiberius_config.authentication(AuthMethod::sql_server(
        config.username.as_deref().unwrap_or_default(),
        config.password().unwrap_or_default(),
    ));
    // Self-signed certificates are the norm on internal servers
    tiberius_config.trust_cert();
    tiberius_config
}

#[async_trait]
impl DatabaseAdapter for SqlServerAdapter {
    async fn test_connection(&self) -> Result<()> {
        let mut client = self.client.lock().await;
        let row = client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| Db2XlsxError::connection_failed(self.config.to_string(), e))?
            .into_row()
            .await
            .map_err(|e| Db2XlsxError::connection_failed(self.config.to_string(), e))?;

        let value = row
            .as_ref()
            .map(|r| r.try_get::<i32, _>(0))
            .transpose()
            .map_err(|e| Db2XlsxError::connection_failed(self.config.to_string(), e))?
            .flatten();

        match value {
            Some(1) => Ok(()),
            _ => Err(Db2XlsxError::configuration(
                "Basic connectivity test failed: unexpected result",
            )),
        }
    }

    async fn fetch_result_set(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        let mut client = self.client.lock().await;
        let mut stream = client
            .query(query.sql.as_str(), &[])
            .await
            .map_err(|e| Db2XlsxError::query_error("Failed to execute query", e))?;

        let columns: Vec<String> = stream
            .columns()
            .await
            .map_err(|e| Db2XlsxError::query_error("Failed to read result metadata", e))?
            .map(|columns| columns.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        debug!("Query returns {} columns", columns.len());

        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| Db2XlsxError::query_error("Failed to fetch rows", e))?;

        let mut result = ResultSet::new(columns);
        for row in &rows {
            let cells = row
                .cells()
                .map(|(column, data)| {
                    let type_name = format!("{:?}", column.column_type());
                    decode_cell(column.name(), &type_name, data, &mut result)
                })
                .collect();
            result.push_row(cells)?;
        }

        Ok(result)
    }

    fn flavour(&self) -> Flavour {
        Flavour::MsSql
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}

/// Converts a `NUMERIC`/`DECIMAL` value to a float cell.
pub fn numeric_cell(value: Numeric) -> CellValue {
    CellValue::Float(value.value() as f64 / 10f64.powi(i32::from(value.scale())))
}

fn decode_cell(
    column: &str,
    type_name: &str,
    data: &ColumnData<'static>,
    result: &mut ResultSet,
) -> CellValue {
    let decoded = match data {
        ColumnData::U8(v) => Ok(v.map(|n| CellValue::Int(i64::from(n))).unwrap_or_default()),
        ColumnData::I16(v) => Ok(v.map(|n| CellValue::Int(i64::from(n))).unwrap_or_default()),
        ColumnData::I32(v) => Ok(v.map(|n| CellValue::Int(i64::from(n))).unwrap_or_default()),
        ColumnData::I64(v) => Ok(v.map(CellValue::Int).unwrap_or_default()),
        ColumnData::F32(v) => Ok(v.map(|n| CellValue::Float(f64::from(n))).unwrap_or_default()),
        ColumnData::F64(v) => Ok(v.map(CellValue::Float).unwrap_or_default()),
        ColumnData::Bit(v) => Ok(v.map(CellValue::Bool).unwrap_or_default()),
        ColumnData::String(v) => Ok(v
            .as_deref()
            .map(|s| CellValue::Text(s.to_string()))
            .unwrap_or_default()),
        ColumnData::Guid(v) => Ok(v.map(text_cell).unwrap_or_default()),
        ColumnData::Binary(v) => Ok(v.as_deref().map(|b| CellValue::Bytes(b.to_vec())).unwrap_or_default()),
        ColumnData::Numeric(v) => Ok(v.map(numeric_cell).unwrap_or_default()),
        ColumnData::Xml(v) => Ok(v
            .as_ref()
            .map(|xml| CellValue::Text(xml.clone().into_owned().into_string()))
            .unwrap_or_default()),
        ColumnData::Date(_) => temporal::<NaiveDate>(data, |v| v.to_string()),
        ColumnData::Time(_) => temporal::<NaiveTime>(data, |v| v.to_string()),
        ColumnData::DateTimeOffset(_) => {
            temporal::<DateTime<FixedOffset>>(data, |v| v.to_rfc3339())
        }
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            temporal::<NaiveDateTime>(data, |v| format_datetime(&v))
        }
    };

    decoded.unwrap_or_else(|e| undecodable(result, column, type_name, e))
}

fn temporal<'a, T>(
    data: &'a ColumnData<'static>,
    render: impl Fn(T) -> String,
) -> tiberius::Result<CellValue>
where
    T: FromSql<'a>,
{
    Ok(T::from_sql(data)?
        .map(|value| CellValue::Text(render(value)))
        .unwrap_or_default())
}
