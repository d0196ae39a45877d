//! Library module for db2xlsx
//!
//! Holds the command-line definition and the export pipeline so both can be
//! driven from tests with scripted input. The binary entry point is in main.rs.
//!
//! # Pipeline
//! 1. Connect to the database and probe the connection
//! 2. Read a SELECT query (from `--query` or the interactive prompt)
//! 3. Fetch the full result set
//! 4. Write it to `<output-dir>/<database>.xlsx`

pub mod prompt;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use db2xlsx_core::export::DEFAULT_OUTPUT_DIR;
use db2xlsx_core::logging::{DEFAULT_LOG_FILE, LogConfig};
use db2xlsx_core::{
    ConnectionConfig, DatabaseAdapter, Db2XlsxError, ExportOptions, ExportSummary, Flavour,
    QueryPolicy, create_adapter, export_result_set, validate_query,
};
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use zeroize::Zeroizing;

pub use prompt::{QUERY_PROMPT, prompt_for_query};

/// Environment variable read when `--password` is not given.
pub const PASSWORD_ENV: &str = "DB2XLSX_PASSWORD";

/// CLI argument structure
#[derive(Parser)]
#[command(name = "db2xlsx")]
#[command(about = "Export the result of a SELECT query to an Excel workbook")]
#[command(version)]
#[command(long_about = "
db2xlsx - one-shot database to spreadsheet export

Connects to a database, asks for a single SELECT query and writes every
returned row into <output-dir>/<database>.xlsx. An existing workbook with the
same name is replaced.

SUPPORTED DATABASES:
- SQLite (--database is the path to the database file)
- PostgreSQL
- MySQL
- SQL Server [if compiled with --features mssql]
- Oracle [if compiled with --features oracle]

EXAMPLES:
  db2xlsx -f sqlite -d ./shop.db
  db2xlsx -f postgresql -H db.internal -u report -d sales --ask-password
  db2xlsx -f mysql -u root -d shop -q 'SELECT * FROM orders'
")]
pub struct Cli {
    /// Database flavour
    #[arg(short = 'f', long, value_enum, help = "Database flavour")]
    pub flavour: FlavourArg,

    /// Database user
    #[arg(short = 'u', long, help = "Database user name")]
    pub username: Option<String>,

    /// Database password
    #[arg(
        short = 'w',
        long,
        env = PASSWORD_ENV,
        hide_env_values = true,
        help = "Database password (prefer --ask-password or the environment variable)"
    )]
    pub password: Option<String>,

    /// Prompt for the password without echo
    #[arg(long, conflicts_with = "password", help = "Prompt for the password without echo")]
    pub ask_password: bool,

    /// Database server host
    #[arg(short = 'H', long, help = "Database server host [default: localhost]")]
    pub hostname: Option<String>,

    /// Database server port
    #[arg(short = 'p', long, help = "Database server port [default: flavour's standard port]")]
    pub port: Option<u16>,

    /// Database name, or file path for SQLite
    #[arg(short = 'd', long, help = "Database name, or database file path for SQLite")]
    pub database: String,

    /// Query to run instead of prompting
    #[arg(short = 'q', long, help = "SELECT query to run instead of prompting for one")]
    pub query: Option<String>,

    /// Query acceptance rule
    #[arg(
        long,
        value_enum,
        default_value_t = PolicyArg::Strict,
        help = "strict: query must start with SELECT; lenient: SELECT and FROM anywhere"
    )]
    pub query_policy: PolicyArg,

    /// Directory for the workbook
    #[arg(
        short = 'o',
        long,
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory that receives the workbook"
    )]
    pub output_dir: PathBuf,

    /// Log file
    #[arg(long, default_value = DEFAULT_LOG_FILE, help = "Append-only log file")]
    pub log_file: PathBuf,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(long, help = "Only report errors on stderr")]
    pub quiet: bool,
}

/// Database flavours accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FlavourArg {
    /// SQLite database file
    #[value(alias = "sqlite3")]
    Sqlite,
    /// MySQL or MariaDB server
    Mysql,
    /// PostgreSQL server
    #[value(alias = "postgres")]
    Postgresql,
    /// Oracle server
    Oracle,
    /// Microsoft SQL Server
    #[value(alias = "sqlserver")]
    Mssql,
}

impl From<FlavourArg> for Flavour {
    fn from(value: FlavourArg) -> Self {
        match value {
            FlavourArg::Sqlite => Self::Sqlite,
            FlavourArg::Mysql => Self::MySql,
            FlavourArg::Postgresql => Self::PostgreSql,
            FlavourArg::Oracle => Self::Oracle,
            FlavourArg::Mssql => Self::MsSql,
        }
    }
}

/// Query policies accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// The query must begin with SELECT
    Strict,
    /// SELECT and FROM may appear anywhere, allowing CTEs
    Lenient,
}

impl From<PolicyArg> for QueryPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Strict => Self::Strict,
            PolicyArg::Lenient => Self::Lenient,
        }
    }
}

impl Cli {
    /// Logging options for this run.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_file: Some(self.log_file.clone()),
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }

    /// Connection settings for this run.
    ///
    /// The password is passed separately because it may come from a prompt.
    pub fn connection_config(&self, password: Option<&str>) -> ConnectionConfig {
        let flavour = Flavour::from(self.flavour);
        let mut config = ConnectionConfig::new(flavour, self.database.as_str());

        if flavour.is_file_based() {
            if self.hostname.is_some() || self.port.is_some() {
                warn!("Host and port are ignored for {} databases", flavour);
            }
        } else {
            if let Some(host) = &self.hostname {
                config = config.with_host(host.as_str());
            }
            if let Some(port) = self.port {
                config = config.with_port(port);
            }
        }

        if let Some(username) = &self.username {
            config = config.with_username(username.as_str());
        }
        if let Some(password) = password {
            config = config.with_password(password);
        }

        config
    }

    /// Output settings for this run.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions::new(&self.output_dir)
    }
}

/// Determines the password for this run.
///
/// `--password` (or the environment variable) wins; otherwise `ask` is called
/// when `--ask-password` was given.
///
/// # Errors
/// Returns error if the password prompt fails
pub fn resolve_password<F>(cli: &Cli, ask: F) -> anyhow::Result<Option<Zeroizing<String>>>
where
    F: FnOnce() -> std::io::Result<String>,
{
    if let Some(password) = &cli.password {
        return Ok(Some(Zeroizing::new(password.clone())));
    }

    if cli.ask_password {
        let password = ask().context("Failed to read password")?;
        return Ok(Some(Zeroizing::new(password)));
    }

    Ok(None)
}

/// Runs one export: connect, obtain a query, fetch, write the workbook.
///
/// Progress and problems are reported on `output` in plain sentences; details
/// go to the log.
///
/// # Errors
/// Returns error if the database cannot be reached, the query is rejected or
/// fails, input ends before a query is accepted, or the workbook cannot be
/// written. No workbook is written in any of these cases.
pub async fn run<R, W>(
    cli: &Cli,
    password: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> anyhow::Result<ExportSummary>
where
    R: BufRead,
    W: Write,
{
    let config = cli.connection_config(password);
    info!("Target: {}", config.redacted_target());

    let adapter = connect(&config, output).await?;

    let policy = QueryPolicy::from(cli.query_policy);
    let query = match &cli.query {
        Some(sql) => validate_query(sql, policy).map_err(|rejection| {
            warn!("Rejected --query under {} policy: {}", policy.as_str(), rejection);
            Db2XlsxError::from(rejection)
        }),
        None => prompt_for_query(input, output, policy),
    };
    let query = match query {
        Ok(query) => query,
        Err(e) => {
            adapter.close().await;
            return Err(e.into());
        }
    };

    let fetched = adapter.fetch_result_set(&query).await;
    adapter.close().await;
    let result = match fetched {
        Ok(result) => result,
        Err(e) => {
            say(output, "Not a valid SQL Query")?;
            return Err(e.into());
        }
    };

    info!(
        "Fetched {} rows and {} columns",
        result.row_count(),
        result.columns.len()
    );
    if result.rows.is_empty() {
        info!("Query returned no rows; writing the header row only");
    }

    let summary = export_result_set(
        &result,
        query.table.as_deref(),
        &adapter.connection_config().output_stem(),
        &cli.export_options(),
    )?;

    say(output, "Success! Excel files have been written.")?;
    say(
        output,
        format!(
            "Output: {} ({} rows, {} columns)",
            summary.path.display(),
            summary.rows_written,
            summary.columns_written
        ),
    )?;
    let warnings = result.warnings.len() + summary.warnings.len();
    if warnings > 0 {
        say(
            output,
            format!("{warnings} warning(s) were recorded; see the log for details"),
        )?;
    }

    Ok(summary)
}

/// Opens the connection, reporting progress the way an operator expects.
async fn connect<W: Write>(
    config: &ConnectionConfig,
    output: &mut W,
) -> anyhow::Result<Box<dyn DatabaseAdapter>> {
    let flavour = config.flavour;
    if !flavour.is_file_based() {
        say(output, "Connecting to Database server...")?;
    }

    match create_adapter(config).await {
        Ok(adapter) => {
            let connected = adapter.flavour();
            if connected.is_file_based() {
                say(output, format!("Connected to {connected} Database!"))?;
            } else {
                say(output, format!("Connected to {connected} server!"))?;
            }
            Ok(adapter)
        }
        Err(e) => {
            match &e {
                Db2XlsxError::DatabaseNotFound { .. } => say(output, "Database does not exist")?,
                Db2XlsxError::Connection { .. } => say(
                    output,
                    format!("Can't connect to {flavour} server on {}", config.host),
                )?,
                _ => {}
            }
            Err(e.into())
        }
    }
}

fn say<W: Write>(output: &mut W, message: impl Display) -> anyhow::Result<()> {
    writeln!(output, "{message}")
        .and_then(|()| output.flush())
        .context("Failed to write to the console")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        temp_env::with_var(PASSWORD_ENV, None::<&str>, || {
            Cli::try_parse_from(std::iter::once("db2xlsx").chain(args.iter().copied())).unwrap()
        })
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-f", "sqlite", "-d", "shop.db"]);

        assert_eq!(cli.flavour, FlavourArg::Sqlite);
        assert_eq!(cli.query_policy, PolicyArg::Strict);
        assert_eq!(cli.output_dir, PathBuf::from("excel_files"));
        assert_eq!(cli.log_file, PathBuf::from("db_to_xlsx.log"));
        assert!(cli.query.is_none());
        assert!(cli.password.is_none());
        assert!(!cli.ask_password);
    }

    #[test]
    fn test_flavour_aliases() {
        assert_eq!(
            parse(&["-f", "postgres", "-d", "x"]).flavour,
            FlavourArg::Postgresql
        );
        assert_eq!(
            parse(&["-f", "sqlserver", "-d", "x"]).flavour,
            FlavourArg::Mssql
        );
    }

    #[test]
    fn test_database_and_flavour_are_required() {
        assert!(Cli::try_parse_from(["db2xlsx", "-f", "mysql"]).is_err());
        assert!(Cli::try_parse_from(["db2xlsx", "-d", "shop"]).is_err());
        assert!(Cli::try_parse_from(["db2xlsx", "-f", "db2", "-d", "shop"]).is_err());
    }

    #[test]
    fn test_password_and_ask_password_conflict() {
        assert!(
            Cli::try_parse_from(["db2xlsx", "-f", "mysql", "-d", "x", "-w", "pw", "--ask-password"])
                .is_err()
        );
    }

    #[test]
    fn test_connection_config_for_server() {
        let cli = parse(&[
            "-f", "postgresql", "-H", "db.internal", "-p", "6543", "-u", "report", "-d", "sales",
        ]);
        let config = cli.connection_config(Some("secret"));

        assert_eq!(config.flavour, Flavour::PostgreSql);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(6543));
        assert_eq!(config.username.as_deref(), Some("report"));
        assert_eq!(config.password(), Some("secret"));
        assert_eq!(config.database, "sales");
    }

    #[test]
    fn test_connection_config_for_sqlite_ignores_host() {
        let cli = parse(&["-f", "sqlite", "-H", "remote", "-d", "data/shop.db"]);
        let config = cli.connection_config(None);

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, None);
        assert_eq!(config.output_stem(), "shop");
    }

    #[test]
    fn test_log_config_from_flags() {
        let cli = parse(&["-f", "sqlite", "-d", "x.db", "-vv", "--log-file", "run.log"]);
        let log = cli.log_config();

        assert_eq!(log.verbose, 2);
        assert!(!log.quiet);
        assert_eq!(log.log_file, Some(PathBuf::from("run.log")));
    }

    #[test]
    fn test_password_from_environment() {
        temp_env::with_var(PASSWORD_ENV, Some("from-env"), || {
            let cli = Cli::try_parse_from(["db2xlsx", "-f", "mysql", "-d", "shop"]).unwrap();
            let password = resolve_password(&cli, || unreachable!()).unwrap();
            assert_eq!(password.as_deref().map(String::as_str), Some("from-env"));
        });
    }

    #[test]
    fn test_password_prompt_only_when_asked() {
        let cli = parse(&["-f", "mysql", "-d", "shop"]);
        let password = resolve_password(&cli, || unreachable!()).unwrap();
        assert!(password.is_none());

        let cli = parse(&["-f", "mysql", "-d", "shop", "--ask-password"]);
        let password = resolve_password(&cli, || Ok("typed".to_string())).unwrap();
        assert_eq!(password.as_deref().map(String::as_str), Some("typed"));
    }

    #[test]
    fn test_password_prompt_failure_is_reported() {
        let cli = parse(&["-f", "mysql", "-d", "shop", "--ask-password"]);
        let result = resolve_password(&cli, || {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no tty"))
        });
        assert!(result.is_err());
    }
}
