//! Database to spreadsheet export tool.
//!
//! Connects to a database, reads one SELECT query from the operator and
//! writes the full result set into an `.xlsx` workbook.
//!
//! # Security Guarantees
//! - Only SELECT queries are executed
//! - Sessions are opened read-only where the driver supports it
//! - Passwords are never logged

use anyhow::Result;
use clap::Parser;
use db2xlsx::{Cli, resolve_password, run};
use db2xlsx_core::logging::init_logging;
use std::io;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_config())?;
    info!("db2xlsx v{} starting", env!("CARGO_PKG_VERSION"));

    let password = resolve_password(&cli, || rpassword::prompt_password("Password: "))?;

    let mut input = io::stdin().lock();
    let mut output = io::stdout();

    let summary = run(
        &cli,
        password.as_deref().map(String::as_str),
        &mut input,
        &mut output,
    )
    .await
    .inspect_err(|e| error!("Export failed: {:#}", e))?;

    info!(
        "Wrote {} rows to {}",
        summary.rows_written,
        summary.path.display()
    );

    Ok(())
}
