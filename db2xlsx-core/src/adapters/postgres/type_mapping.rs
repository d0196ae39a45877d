//! PostgreSQL value decoding.
//!
//! Columns are decoded according to their wire type. Types without a decoder
//! are read as text when the driver allows it and left blank otherwise.

use crate::adapters::helpers::{
    ValueKind, decimal_cell, format_datetime, text_cell, undecodable,
};
use crate::models::{CellValue, ResultSet};
use sqlx::postgres::PgRow;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, Uuid};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Maps a PostgreSQL type name to a decoding strategy.
///
/// # Example
/// ```rust
/// use db2xlsx_core::adapters::helpers::ValueKind;
/// use db2xlsx_core::adapters::postgres::map_postgresql_type;
///
/// assert_eq!(map_postgresql_type("int4"), ValueKind::Int);
/// assert_eq!(map_postgresql_type("TIMESTAMPTZ"), ValueKind::DateTimeTz);
/// ```
pub fn map_postgresql_type(type_name: &str) -> ValueKind {
    match type_name.trim().to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => ValueKind::Bool,
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" => ValueKind::Int,
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => ValueKind::Float,
        "NUMERIC" | "DECIMAL" => ValueKind::Decimal,
        "DATE" => ValueKind::Date,
        "TIME" => ValueKind::Time,
        "TIMESTAMP" => ValueKind::DateTime,
        "TIMESTAMPTZ" => ValueKind::DateTimeTz,
        "UUID" => ValueKind::Uuid,
        "JSON" | "JSONB" => ValueKind::Json,
        "BYTEA" => ValueKind::Bytes,
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => ValueKind::Text,
        _ => ValueKind::Other,
    }
}

/// Decodes every value of a row, in column order.
pub fn decode_row(row: &PgRow, result: &mut ResultSet) -> Vec<CellValue> {
    row.columns()
        .iter()
        .map(|column| {
            let type_name = column.type_info().name().to_string();
            decode_value(row, column.ordinal(), column.name(), &type_name, result)
        })
        .collect()
}

fn decode_value(
    row: &PgRow,
    index: usize,
    column: &str,
    type_name: &str,
    result: &mut ResultSet,
) -> CellValue {
    match row.try_get_raw(index).map(|raw| raw.is_null()) {
        Ok(true) => return CellValue::Null,
        Ok(false) => {}
        Err(e) => return undecodable(result, column, type_name, e),
    }

    let decoded = match map_postgresql_type(type_name) {
        ValueKind::Bool => row.try_get::<bool, _>(index).map(CellValue::Bool),
        ValueKind::Int | ValueKind::UnsignedInt => row
            .try_get::<i64, _>(index)
            .or_else(|_| row.try_get::<i32, _>(index).map(i64::from))
            .or_else(|_| row.try_get::<i16, _>(index).map(i64::from))
            .map(CellValue::Int),
        ValueKind::Float => row
            .try_get::<f64, _>(index)
            .or_else(|_| row.try_get::<f32, _>(index).map(f64::from))
            .map(CellValue::Float),
        ValueKind::Decimal => row
            .try_get::<BigDecimal, _>(index)
            .map(|value| decimal_cell(&value.to_string())),
        ValueKind::Date => row.try_get::<NaiveDate, _>(index).map(text_cell),
        ValueKind::Time => row.try_get::<NaiveTime, _>(index).map(text_cell),
        ValueKind::DateTime => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|value| CellValue::Text(format_datetime(&value))),
        ValueKind::DateTimeTz => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|value| CellValue::Text(value.to_rfc3339())),
        ValueKind::Uuid => row.try_get::<Uuid, _>(index).map(text_cell),
        ValueKind::Json => row
            .try_get::<serde_json::Value, _>(index)
            .map(|value| CellValue::Text(value.to_string())),
        ValueKind::Bytes => row.try_get::<Vec<u8>, _>(index).map(CellValue::Bytes),
        ValueKind::Text | ValueKind::Other => {
            row.try_get::<String, _>(index).map(CellValue::Text)
        }
    };

    decoded.unwrap_or_else(|e| undecodable(result, column, type_name, e))
}
