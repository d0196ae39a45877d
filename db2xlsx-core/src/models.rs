//! Data models shared by the adapters and the spreadsheet exporter.
//!
//! A run produces exactly one [`ResultSet`]: it is created by query execution,
//! consumed once by the exporter and dropped at process exit.

use std::fmt;

/// Supported database flavours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavour {
    /// SQLite database file
    Sqlite,
    /// MySQL or MariaDB server
    MySql,
    /// PostgreSQL server
    PostgreSql,
    /// Oracle Database server
    Oracle,
    /// Microsoft SQL Server
    MsSql,
}

impl Flavour {
    /// Name used on the command line and in connection descriptions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::Oracle => "oracle",
            Self::MsSql => "mssql",
        }
    }

    /// Default server port, `None` for file-based databases.
    pub const fn default_port(self) -> Option<u16> {
        match self {
            Self::Sqlite => None,
            Self::MySql => Some(3306),
            Self::PostgreSql => Some(5432),
            Self::Oracle => Some(1521),
            Self::MsSql => Some(1433),
        }
    }

    /// Whether the database is a local file rather than a server.
    pub const fn is_file_based(self) -> bool {
        matches!(self, Self::Sqlite)
    }
}

impl fmt::Display for Flavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite => write!(f, "SQLite"),
            Self::MySql => write!(f, "MySQL"),
            Self::PostgreSql => write!(f, "PostgreSQL"),
            Self::Oracle => write!(f, "Oracle"),
            Self::MsSql => write!(f, "SQL Server"),
        }
    }
}

/// A single scalar value from a result row.
///
/// Driver-specific types are normalised into this small set before export:
/// decimals become `Float`, temporal and UUID values become `Text`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// SQL `NULL`, or a value that could not be decoded
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number, including converted decimals
    Float(f64),
    /// Text, including rendered dates, times and UUIDs
    Text(String),
    /// Raw binary data
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Whether the cell is blank.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Rows and column names produced by one query execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Data rows; each row has exactly `columns.len()` cells
    pub rows: Vec<Vec<CellValue>>,
    /// Non-fatal issues found while decoding rows
    pub warnings: Vec<String>,
}

impl ResultSet {
    /// Creates an empty result with the given column names.
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Appends a row, rejecting rows whose width differs from the header.
    ///
    /// # Errors
    /// Returns a query execution error when the row width does not match.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> crate::Result<()> {
        if row.len() != self.columns.len() {
            return Err(crate::error::Db2XlsxError::query_failed(format!(
                "Row {} has {} values but the result has {} columns",
                self.rows.len() + 1,
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Records a warning once, ignoring duplicates.
    pub fn warn_once(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Number of data rows, excluding the header.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the query returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
