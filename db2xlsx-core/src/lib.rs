//! Core library for db2xlsx.
//!
//! Connects to a relational database, runs one validated SELECT query and
//! writes the result set into a single-sheet `.xlsx` workbook.
//!
//! # Guarantees
//! - Only queries accepted by [`validation::validate_query`] reach a database
//! - Passwords are never logged or included in error messages
//! - Connections are opened read-only where the driver supports it
//!
//! # Architecture
//! - Factory pattern for database adapter instantiation ([`adapters::create_adapter`])
//! - Driver values normalised into [`CellValue`] before export
//! - Error handling with credential sanitization ([`Db2XlsxError`])

pub mod adapters;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, DatabaseAdapter, create_adapter};
pub use error::{Db2XlsxError, Result};
pub use export::{ExportOptions, ExportSummary, export_result_set};
pub use models::{CellValue, Flavour, ResultSet};
pub use validation::{QueryPolicy, QueryRejection, ValidatedQuery, validate_query};
