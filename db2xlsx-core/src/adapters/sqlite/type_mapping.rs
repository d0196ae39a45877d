//! SQLite value decoding.
//!
//! SQLite uses a dynamic type system: a column declared `INTEGER` can still
//! hold text. Each value is therefore decoded by its runtime storage class
//! (`INTEGER`, `REAL`, `TEXT`, `BLOB`, `NULL`).

use crate::adapters::helpers::{ValueKind, undecodable};
use crate::models::{CellValue, ResultSet};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Maps a SQLite storage class or type name to a decoding strategy.
///
/// # Example
/// ```rust
/// use db2xlsx_core::adapters::helpers::ValueKind;
/// use db2xlsx_core::adapters::sqlite::map_sqlite_storage_class;
///
/// assert_eq!(map_sqlite_storage_class("integer"), ValueKind::Int);
/// assert_eq!(map_sqlite_storage_class("BLOB"), ValueKind::Bytes);
/// ```
pub fn map_sqlite_storage_class(type_name: &str) -> ValueKind {
    match type_name.trim().to_uppercase().as_str() {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => ValueKind::Int,
        "REAL" | "FLOAT" | "DOUBLE" => ValueKind::Float,
        "NUMERIC" => ValueKind::Decimal,
        "BOOLEAN" => ValueKind::Bool,
        "BLOB" => ValueKind::Bytes,
        "TEXT" => ValueKind::Text,
        _ => ValueKind::Other,
    }
}

/// Decodes every value of a row, in column order.
pub fn decode_row(row: &SqliteRow, result: &mut ResultSet) -> Vec<CellValue> {
    row.columns()
        .iter()
        .map(|column| decode_value(row, column.ordinal(), column.name(), result))
        .collect()
}

fn decode_value(row: &SqliteRow, index: usize, column: &str, result: &mut ResultSet) -> CellValue {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(e) => return undecodable(result, column, "UNKNOWN", e),
    };
    if raw.is_null() {
        return CellValue::Null;
    }
    let type_name = raw.type_info().name().to_string();

    let decoded = match map_sqlite_storage_class(&type_name) {
        ValueKind::Int => row.try_get::<i64, _>(index).map(CellValue::Int),
        ValueKind::Float | ValueKind::Decimal => row.try_get::<f64, _>(index).map(CellValue::Float),
        ValueKind::Bool => row.try_get::<bool, _>(index).map(CellValue::Bool),
        ValueKind::Bytes => row.try_get::<Vec<u8>, _>(index).map(CellValue::Bytes),
        _ => row.try_get::<String, _>(index).map(CellValue::Text),
    };

    decoded.unwrap_or_else(|e| undecodable(result, column, &type_name, e))
}
