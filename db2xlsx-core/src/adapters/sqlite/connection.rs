//! SQLite connection handling.
//!
//! # Security Features
//! - Opens databases in read-only mode
//! - Refuses to create a database file that does not exist
//! - No network access required

use super::{ConnectionConfig, SqliteAdapter};
use crate::Result;
use crate::adapters::helpers::connect_once;
use crate::error::Db2XlsxError;
use sqlx::ConnectOptions;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::Path;
use tokio::sync::Mutex;

impl SqliteAdapter {
    /// Opens the SQLite database named by `config.database`.
    ///
    /// # Errors
    /// Returns error if:
    /// - The database file does not exist (checked before the driver runs)
    /// - The file cannot be opened as a SQLite database
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        ensure_database_file(config.database_path())?;

        let connection = connect_once(&build_connect_options(&config), &config).await?;
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            config,
        })
    }
}

/// Fails with `DatabaseNotFound` unless `path` is an existing regular file.
///
/// # Errors
/// Returns `DatabaseNotFound` if the path is missing or not a file
pub fn ensure_database_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Db2XlsxError::DatabaseNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Read-only options for the file named by `config.database`.
pub fn build_connect_options(config: &ConnectionConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(config.database_path())
        .read_only(config.read_only)
        .create_if_missing(false)
        .disable_statement_logging()
}
