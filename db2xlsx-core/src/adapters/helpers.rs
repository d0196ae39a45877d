//! Helper utilities for database adapter implementations.
//!
//! Provides value conversions shared across the driver-specific row decoders
//! so every flavour normalises temporal, decimal and unknown values the same
//! way.

#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
use super::ConnectionConfig;
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
use crate::{Result, error::Db2XlsxError};
use crate::models::{CellValue, ResultSet};
use std::fmt::Display;

/// How a column's values should be decoded into a [`CellValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Booleans
    Bool,
    /// Signed integers of any width
    Int,
    /// Unsigned 64-bit integers; values above `i64::MAX` become floats
    UnsignedInt,
    /// Floating point numbers
    Float,
    /// Exact numerics, exported as floating point
    Decimal,
    /// Calendar dates, written as `YYYY-MM-DD`
    Date,
    /// Times of day
    Time,
    /// Timestamps without a time zone
    DateTime,
    /// Timestamps with a time zone, written as RFC 3339
    DateTimeTz,
    /// UUIDs, written in hyphenated form
    Uuid,
    /// JSON documents, written as text
    Json,
    /// Binary data
    Bytes,
    /// Character data
    Text,
    /// Unknown type, decoded on a best-effort basis
    Other,
}

/// Converts the textual form of an exact numeric into a float cell.
///
/// Decimal types are exported as numbers, so precision beyond `f64` is lost.
///
/// # Example
/// ```rust
/// use db2xlsx_core::adapters::helpers::decimal_cell;
/// use db2xlsx_core::models::CellValue;
///
/// assert_eq!(decimal_cell("12.50"), CellValue::Float(12.5));
/// assert_eq!(decimal_cell("NaN"), CellValue::Text("NaN".to_string()));
/// ```
pub fn decimal_cell(text: &str) -> CellValue {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => CellValue::Float(value),
        _ => CellValue::Text(text.to_string()),
    }
}

/// Converts an unsigned 64-bit integer, falling back to a float above `i64::MAX`.
pub fn unsigned_cell(value: u64) -> CellValue {
    i64::try_from(value).map_or_else(|_| CellValue::Float(value as f64), CellValue::Int)
}

/// Renders a temporal or UUID value as text.
pub fn text_cell(value: impl Display) -> CellValue {
    CellValue::Text(value.to_string())
}

/// Formats a naive timestamp the way spreadsheets display it.
pub fn format_datetime(value: &chrono::NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// Records a decode failure for a column and yields a blank cell.
///
/// The warning is reported once per column, not once per row.
pub fn undecodable(
    result: &mut ResultSet,
    column: &str,
    type_name: &str,
    error: impl Display,
) -> CellValue {
    result.warn_once(format!(
        "Column '{}' has unsupported type {}; its cells are left blank ({})",
        column, type_name, error
    ));
    CellValue::Null
}

/// Opens a single sqlx connection, bounded by `config.connect_timeout`.
///
/// The driver is asked exactly once: a refused or unreachable server fails
/// immediately instead of being retried until the timeout runs out.
///
/// # Errors
/// Returns `Connection` if the attempt fails or does not finish in time
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub(crate) async fn connect_once<O>(options: &O, config: &ConnectionConfig) -> Result<O::Connection>
where
    O: sqlx::ConnectOptions,
    O::Connection: Sized,
{
    tokio::time::timeout(config.connect_timeout, options.connect())
        .await
        .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))?
        .map_err(|e| Db2XlsxError::connection_failed(config.to_string(), e))
}

/// Looks up the open connection behind an adapter's lock.
///
/// # Errors
/// Returns `Configuration` once the adapter has been closed
#[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
pub(crate) fn open_connection<C>(slot: &mut Option<C>) -> Result<&mut C> {
    slot.as_mut()
        .ok_or_else(|| Db2XlsxError::configuration("The database connection is already closed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_cell() {
        assert_eq!(decimal_cell("0"), CellValue::Float(0.0));
        assert_eq!(decimal_cell("-1234.5678"), CellValue::Float(-1234.5678));
        assert_eq!(
            decimal_cell("Infinity"),
            CellValue::Text("Infinity".to_string())
        );
    }

    #[test]
    fn test_unsigned_cell() {
        assert_eq!(unsigned_cell(42), CellValue::Int(42));
        assert_eq!(unsigned_cell(i64::MAX as u64), CellValue::Int(i64::MAX));
        assert_eq!(unsigned_cell(u64::MAX), CellValue::Float(u64::MAX as f64));
    }

    #[test]
    fn test_format_datetime() {
        let value = chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_opt(13, 5, 9))
            .unwrap_or_default();
        assert_eq!(format_datetime(&value), "2024-02-29 13:05:09");
    }

    #[test]
    fn test_undecodable_warns_once() {
        let mut result = ResultSet::new(vec!["geom".to_string()]);
        for _ in 0..3 {
            let cell = undecodable(&mut result, "geom", "GEOMETRY", "no decoder");
            assert!(cell.is_null());
        }
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("geom"));
    }

    #[cfg(any(feature = "postgresql", feature = "mysql", feature = "sqlite"))]
    #[test]
    fn test_open_connection_after_close() {
        let mut slot = Some(7_u8);
        assert!(matches!(open_connection(&mut slot), Ok(7)));

        slot.take();
        assert!(matches!(
            open_connection(&mut slot),
            Err(Db2XlsxError::Configuration { .. })
        ));
    }
}
