//! Logging setup: an append-only log file plus stderr.
//!
//! The log file keeps a record of every run (connections, fetched rows,
//! rejected queries, failures). Console output stays quiet by default so the
//! interactive prompt is not interleaved with log lines.

use crate::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default log file name, created in the working directory.
pub const DEFAULT_LOG_FILE: &str = "db_to_xlsx.log";

/// Logging options collected from the command line.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file to append to; `None` disables file logging
    pub log_file: Option<PathBuf>,
    /// Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
    pub verbose: u8,
    /// Only report errors on stderr
    pub quiet: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            verbose: 0,
            quiet: false,
        }
    }
}

/// Level written to the log file.
pub const fn file_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Level written to stderr.
pub const fn console_level(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, v) => file_level(v),
    }
}

/// Initializes the global tracing subscriber.
///
/// # Errors
/// Returns a configuration error if the log file cannot be opened or a global
/// subscriber is already installed.
///
/// # Example
/// ```rust,no_run
/// use db2xlsx_core::logging::{LogConfig, init_logging};
///
/// init_logging(&LogConfig::default()).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let file_layer = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    crate::error::Db2XlsxError::io(
                        format!("Failed to open log file {}", path.display()),
                        e,
                    )
                })?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(file_level(config.verbose)),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_level(config.verbose, config.quiet));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| {
            crate::error::Db2XlsxError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}
