//! MySQL connection setup.

use super::{ConnectionConfig, MySqlAdapter};
use crate::Result;
use crate::adapters::helpers::connect_once;
use sqlx::ConnectOptions;
use sqlx::mysql::MySqlConnectOptions;
use tokio::sync::Mutex;

impl MySqlAdapter {
    /// Connects to the MySQL server described by `config`.
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
pub fn build_connect_options(config: &ConnectionConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .database(&config.database)
        .charset("utf8mb4");

    if let Some(port) = config.effective_port() {
        options = options.port(port);
    }
    if let Some(username) = &config.username {
        options = options.username(username);
    }
    if let Some(password) = config.password() {
        options = options.password(password);
    }

    options.disable_statement_logging()
}
