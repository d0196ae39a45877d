//! MySQL value decoding.

use crate::adapters::helpers::{
    ValueKind, decimal_cell, format_datetime, text_cell, undecodable, unsigned_cell,
};
use crate::models::{CellValue, ResultSet};
use sqlx::mysql::MySqlRow;
use sqlx::types::BigDecimal;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Maps a MySQL type name, as reported by the driver, to a decoding strategy.
///
/// # Example
/// ```rust
/// use db2xlsx_core::adapters::helpers::ValueKind;
/// use db2xlsx_core::adapters::mysql::map_mysql_type;
///
/// assert_eq!(map_mysql_type("BIGINT UNSIGNED"), ValueKind::UnsignedInt);
/// assert_eq!(map_mysql_type("varchar"), ValueKind::Text);
/// ```
pub fn map_mysql_type(type_name: &str) -> ValueKind {
    let upper = type_name.trim().to_uppercase();
    if upper.ends_with(" UNSIGNED") {
        return ValueKind::UnsignedInt;
    }

    match upper.as_str() {
        "BOOLEAN" | "BOOL" => ValueKind::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => ValueKind::Int,
        "FLOAT" | "DOUBLE" => ValueKind::Float,
        "DECIMAL" => ValueKind::Decimal,
        "DATE" => ValueKind::Date,
        "TIME" => ValueKind::Time,
        "DATETIME" | "TIMESTAMP" => ValueKind::DateTime,
        "JSON" => ValueKind::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            ValueKind::Bytes
        }
        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET" => {
            ValueKind::Text
        }
        _ => ValueKind::Other,
    }
}

/// Decodes every value of a row, in column order.
pub fn decode_row(row: &MySqlRow, result: &mut ResultSet) -> Vec<CellValue> {
    row.columns()
        .iter()
        .map(|column| {
            let type_name = column.type_info().name().to_string();
            decode_value(row, column.ordinal(), column.name(), &type_name, result)
        })
        .collect()
}

fn decode_value(
    row: &MySqlRow,
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

    let decoded = match map_mysql_type(type_name) {
        ValueKind::Bool => row.try_get::<bool, _>(index).map(CellValue::Bool),
        ValueKind::Int => row.try_get::<i64, _>(index).map(CellValue::Int),
        ValueKind::UnsignedInt => row.try_get::<u64, _>(index).map(unsigned_cell),
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
        ValueKind::Json => row
            .try_get::<serde_json::Value, _>(index)
            .map(|value| CellValue::Text(value.to_string())),
        ValueKind::Bytes => row
            .try_get::<String, _>(index)
            .map(CellValue::Text)
            .or_else(|_| row.try_get::<Vec<u8>, _>(index).map(CellValue::Bytes)),
        ValueKind::Text => row.try_get::<String, _>(index).map(CellValue::Text),
        ValueKind::DateTimeTz | ValueKind::Uuid | ValueKind::Other => row
            .try_get::<String, _>(index)
            .map(CellValue::Text)
            .or_else(|_| row.try_get::<i64, _>(index).map(CellValue::Int))
            .or_else(|_| row.try_get::<f64, _>(index).map(CellValue::Float))
            .or_else(|_| row.try_get::<Vec<u8>, _>(index).map(CellValue::Bytes)),
    };

    decoded.unwrap_or_else(|e| undecodable(result, column, type_name, e))
}
