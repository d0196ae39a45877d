//! Interactive query prompt.

use db2xlsx_core::error::Db2XlsxError;
use db2xlsx_core::{QueryPolicy, Result, ValidatedQuery, validate_query};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Text shown before each query is read.
pub const QUERY_PROMPT: &str = "Enter Query for any table here (only SELECT permitted): ";

/// Prompts until a query passes validation under `policy`.
///
/// Rejected queries are reported on `output` and the prompt is shown again;
/// nothing is executed until a query is accepted.
///
/// # Errors
/// Returns [`Db2XlsxError::Cancelled`] when `input` reaches end of file, or an
/// I/O error if the terminal cannot be read or written.
pub fn prompt_for_query<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    policy: QueryPolicy,
) -> Result<ValidatedQuery> {
    let mut line = String::new();

    loop {
        write!(output, "{QUERY_PROMPT}")
            .and_then(|()| output.flush())
            .map_err(|e| Db2XlsxError::io("Failed to write query prompt", e))?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .map_err(|e| Db2XlsxError::io("Failed to read query", e))?;
        if read == 0 {
            // Keep the shell prompt off the query prompt line
            writeln!(output).map_err(|e| Db2XlsxError::io("Failed to write to the terminal", e))?;
            return Err(Db2XlsxError::Cancelled);
        }

        match validate_query(&line, policy) {
            Ok(query) => {
                info!(
                    "Query accepted (table: {})",
                    query.table.as_deref().unwrap_or("<unknown>")
                );
                debug!("Query text: {}", query.sql);
                return Ok(query);
            }
            Err(rejection) => {
                writeln!(output, "{rejection}")
                    .map_err(|e| Db2XlsxError::io("Failed to write query rejection", e))?;
                warn!("Rejected query under {} policy: {}", policy.as_str(), rejection);
            }
        }
    }
}
