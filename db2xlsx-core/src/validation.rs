//! Lexical validation of user-supplied queries.
//!
//! Only read queries are accepted. The check is purely lexical: keywords are
//! matched as whole words, case-insensitively. It is not an SQL parser and
//! offers no injection defense; the database user's privileges remain the
//! real safety boundary.
//!
//! # Example
//! ```rust
//! use db2xlsx_core::validation::{QueryPolicy, validate_query};
//!
//! let query = validate_query("select id, name from users;", QueryPolicy::Strict).unwrap();
//! assert_eq!(query.table.as_deref(), Some("users"));
//!
//! assert!(validate_query("DELETE FROM users", QueryPolicy::Strict).is_err());
//! ```

use thiserror::Error;

/// Reasons a query is refused before it reaches the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryRejection {
    /// Nothing but whitespace was entered
    #[error("The query is empty.")]
    Empty,

    /// The query is not a SELECT statement
    #[error("Not a SELECT Query. Only SELECT Queries are permitted.")]
    NotSelect,

    /// The query has no FROM clause to name the exported table
    #[error("The query has no FROM clause. Name the table to export with FROM <table>.")]
    MissingFrom,
}

/// How strictly a query must look like a SELECT statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPolicy {
    /// The query must begin with the SELECT keyword
    #[default]
    Strict,
    /// SELECT and FROM must appear somewhere in the query (allows CTEs)
    Lenient,
}

impl QueryPolicy {
    /// Name used on the command line and in log messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

/// A query accepted by [`validate_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    /// Query text, trimmed of surrounding whitespace
    pub sql: String,
    /// Table named after the first FROM keyword, if one could be extracted
    pub table: Option<String>,
}

/// Validates a query string against the given policy.
///
/// # Errors
/// Returns the [`QueryRejection`] describing why the query was refused.
pub fn validate_query(input: &str, policy: QueryPolicy) -> Result<ValidatedQuery, QueryRejection> {
    let sql = input.trim();
    if sql.is_empty() {
        return Err(QueryRejection::Empty);
    }

    let words = keyword_candidates(sql);

    let is_select = match policy {
        QueryPolicy::Strict => words
            .first()
            .is_some_and(|(offset, word)| *offset == 0 && word.eq_ignore_ascii_case("SELECT")),
        QueryPolicy::Lenient => words
            .iter()
            .any(|(_, word)| word.eq_ignore_ascii_case("SELECT")),
    };
    if !is_select {
        return Err(QueryRejection::NotSelect);
    }

    let Some(&(from_offset, from_word)) = words
        .iter()
        .find(|(_, word)| word.eq_ignore_ascii_case("FROM"))
    else {
        return Err(QueryRejection::MissingFrom);
    };

    let table = extract_table_name(&sql[from_offset + from_word.len()..]);

    Ok(ValidatedQuery {
        sql: sql.to_string(),
        table,
    })
}

/// Splits the input into identifier-like words with their byte offsets.
fn keyword_candidates(sql: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;

    for (index, ch) in sql.char_indices() {
        let is_word_char = ch.is_alphanumeric() || ch == '_';
        match (start, is_word_char) {
            (None, true) => start = Some(index),
            (Some(begin), false) => {
                words.push((begin, &sql[begin..index]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = start {
        words.push((begin, &sql[begin..]));
    }

    words
}

/// Best-effort table name from the text that follows a FROM keyword.
///
/// Returns `None` for subqueries. Joins, aliases and comma-separated table
/// lists only yield the first table.
fn extract_table_name(after_from: &str) -> Option<String> {
    let rest = after_from.trim_start();
    if rest.starts_with('(') {
        return None;
    }

    let token = rest.split_whitespace().next()?;
    let token = token
        .split([',', ';', ')'])
        .next()
        .unwrap_or_default();

    let name = token
        .split('.')
        .map(|part| part.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']')))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    (!name.is_empty()).then_some(name)
}
