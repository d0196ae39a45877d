//! Spreadsheet export of a result set.
//!
//! One result set becomes one workbook with a single worksheet: a bold,
//! frozen header row followed by the data rows in result order. The workbook
//! is assembled in memory and saved in one call, replacing any previous file
//! at the same path.

use crate::Result;
use crate::error::Db2XlsxError;
use crate::models::{CellValue, ResultSet};
use base64::Engine;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default directory for generated workbooks.
pub const DEFAULT_OUTPUT_DIR: &str = "excel_files";

/// Rows per worksheet, including the header row.
pub const MAX_ROWS: usize = 1_048_576;

/// Columns per worksheet.
pub const MAX_COLUMNS: usize = 16_384;

/// Characters per cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Longest worksheet name Excel accepts.
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Integers beyond this magnitude cannot be stored exactly as an Excel number.
const MAX_EXACT_INTEGER: i64 = 1 << 53;

/// Where and how workbooks are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Directory that receives the workbook; created if missing
    pub output_dir: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ExportOptions {
    /// Creates export options writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Path of the workbook for a database stem: `<output_dir>/<stem>.xlsx`.
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{}.xlsx", stem))
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Path of the written workbook
    pub path: PathBuf,
    /// Data rows written below the header
    pub rows_written: usize,
    /// Header cells written
    pub columns_written: usize,
    /// Worksheet name used
    pub sheet_name: String,
    /// Cells that had to be altered to fit the format
    pub warnings: Vec<String>,
}

/// Makes a table name usable as a worksheet name.
///
/// Characters Excel forbids (`[ ] : * ? / \`) become `_`, surrounding
/// apostrophes are removed and the result is cut to 31 characters. An empty
/// result falls back to `Sheet1`.
///
/// # Example
/// ```rust
/// use db2xlsx_core::export::sanitize_sheet_name;
///
/// assert_eq!(sanitize_sheet_name("dbo.[Order Details]"), "dbo._Order Details_");
/// assert_eq!(sanitize_sheet_name("''"), "Sheet1");
/// ```
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_matches('\'');
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect();
    // Truncation can expose an apostrophe at the end
    let truncated = truncated.trim_end_matches('\'').trim_end();

    if truncated.is_empty() {
        "Sheet1".to_string()
    } else if truncated.eq_ignore_ascii_case("history") {
        // Reserved by Excel
        "History_".to_string()
    } else {
        truncated.to_string()
    }
}

/// Rejects result sets that cannot fit in a single worksheet.
///
/// # Errors
/// Returns `ExportLimit` when the row or column count exceeds Excel's bounds
pub fn check_limits(result: &ResultSet) -> Result<()> {
    if result.column_count() > MAX_COLUMNS {
        return Err(Db2XlsxError::export_limit(format!(
            "{} columns exceed the worksheet maximum of {}",
            result.column_count(),
            MAX_COLUMNS
        )));
    }

    if result.row_count() + 1 > MAX_ROWS {
        return Err(Db2XlsxError::export_limit(format!(
            "{} rows plus the header exceed the worksheet maximum of {}",
            result.row_count(),
            MAX_ROWS
        )));
    }

    Ok(())
}

/// Writes the result set to `<output_dir>/<stem>.xlsx`.
///
/// The worksheet is named after `table` (sanitized), or `Sheet1` when the
/// table is unknown. An existing file at the output path is replaced.
///
/// # Errors
/// Returns error if the result set exceeds worksheet limits, the output
/// directory cannot be created, or the workbook cannot be written
pub fn export_result_set(
    result: &ResultSet,
    table: Option<&str>,
    stem: &str,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    check_limits(result)?;

    std::fs::create_dir_all(&options.output_dir).map_err(|e| {
        Db2XlsxError::io(
            format!(
                "Failed to create output directory {}",
                options.output_dir.display()
            ),
            e,
        )
    })?;

    let path = options.output_path(stem);
    let sheet_name = sanitize_sheet_name(table.unwrap_or_default());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(&sheet_name)
        .map_err(|e| Db2XlsxError::spreadsheet(format!("Invalid sheet name '{}'", sheet_name), e))?;

    let warnings = write_result_set(worksheet, result)?;
    for warning in &warnings {
        warn!("{}", warning);
    }

    save_workbook(&mut workbook, &path)?;
    info!(
        "Wrote {} rows and {} columns to {}",
        result.row_count(),
        result.column_count(),
        path.display()
    );

    Ok(ExportSummary {
        path,
        rows_written: result.row_count(),
        columns_written: result.column_count(),
        sheet_name,
        warnings,
    })
}

/// Writes the header and data rows into a worksheet.
///
/// Returns warnings for cells that were altered (truncated text).
///
/// # Errors
/// Returns a spreadsheet error if a cell cannot be written
pub fn write_result_set(worksheet: &mut Worksheet, result: &ResultSet) -> Result<Vec<String>> {
    let header_format = Format::new().set_bold();
    let mut warnings = Vec::new();

    for (col, name) in result.columns.iter().enumerate() {
        let col = column_index(col)?;
        let name = fit_text(name, 0, col, &mut warnings);
        worksheet
            .write_string_with_format(0, col, name, &header_format)
            .map_err(|e| Db2XlsxError::spreadsheet("Failed to write header row", e))?;
    }
    if !result.columns.is_empty() {
        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| Db2XlsxError::spreadsheet("Failed to freeze header row", e))?;
    }

    for (index, values) in result.rows.iter().enumerate() {
        let row = row_index(index + 1)?;
        for (col, value) in values.iter().enumerate() {
            let col = column_index(col)?;
            write_cell(worksheet, row, col, value, &mut warnings)
                .map_err(|e| Db2XlsxError::spreadsheet(format!("Failed to write row {}", row), e))?;
        }
    }

    Ok(warnings)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    warnings: &mut Vec<String>,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    match value {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Int(n) if (-MAX_EXACT_INTEGER..=MAX_EXACT_INTEGER).contains(n) => {
            worksheet.write_number(row, col, *n as f64)?;
        }
        CellValue::Int(n) => {
            worksheet.write_string(row, col, n.to_string())?;
        }
        CellValue::Float(f) if f.is_finite() => {
            worksheet.write_number(row, col, *f)?;
        }
        CellValue::Float(f) => {
            worksheet.write_string(row, col, f.to_string())?;
        }
        CellValue::Text(s) => {
            worksheet.write_string(row, col, fit_text(s, row, col, warnings))?;
        }
        CellValue::Bytes(bytes) => {
            let encoded = format!(
                "base64:{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            );
            worksheet.write_string(row, col, fit_text(&encoded, row, col, warnings))?;
        }
    }

    Ok(())
}

/// Cuts text to the cell limit, recording a warning when it does.
fn fit_text<'a>(text: &'a str, row: u32, col: u16, warnings: &mut Vec<String>) -> &'a str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((byte_index, _)) => {
            warnings.push(format!(
                "Cell at row {}, column {} truncated to {} characters",
                row + 1,
                u32::from(col) + 1,
                MAX_CELL_CHARS
            ));
            &text[..byte_index]
        }
        None => text,
    }
}

fn row_index(index: usize) -> Result<u32> {
    u32::try_from(index)
        .map_err(|_| Db2XlsxError::export_limit(format!("row {} is out of range", index)))
}

fn column_index(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| Db2XlsxError::export_limit(format!("column {} is out of range", index)))
}

fn save_workbook(workbook: &mut Workbook, path: &Path) -> Result<()> {
    workbook
        .save(path)
        .map_err(|e| Db2XlsxError::spreadsheet(format!("Failed to save {}", path.display()), e))
}
