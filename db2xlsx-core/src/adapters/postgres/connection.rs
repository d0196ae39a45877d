//! PostgreSQL connection setup.
//!
//! # Security Features
//! - Sessions start with `default_transaction_read_only=on`
//! - A single connection with a bounded connect timeout
//! - Statement logging disabled so query text stays out of driver logs

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use crate::adapters::helpers::connect_once;
use sqlx::ConnectOptions;
use sqlx::postgres::PgConnectOptions;
use tokio::sync::Mutex;

impl PostgresAdapter {
    /// Connects to the PostgreSQL server described by `config`.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the connection fails
    pub async fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let connection = connect_once(&build_connect_options(&config), &config).await?;
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            config,
        })
    }
}

/// Maps a [`ConnectionConfig`] onto the driver's option builder.
pub fn build_connect_options(config: &ConnectionConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .database(&config.database)
        .application_name("db2xlsx");

    if let Some(port) = config.effective_port() {
        options = options.port(port);
    }
    if let Some(username) = &config.username {
        options = options.username(username);
    }
    if let Some(password) = config.password() {
        options = options.password(password);
    }
    if config.read_only {
        options = options.options([("default_transaction_read_only", "on")]);
    }

    options.disable_statement_logging()
}
