//! Structural allow-list for generated queries.
//!
//! This is deliberately NOT a SQL parser. The composer's output is trusted
//! to be well-formed; the guard only enforces the read-only, single-statement
//! shape before anything reaches the database.

use crate::error::StoreError;

/// Reject anything that is not a single read-only statement.
///
/// Accepts a leading `SELECT` or `WITH` keyword (case-insensitive) and no
/// second statement after a semicolon. A single trailing semicolon is
/// tolerated.
pub fn ensure_single_select(query: &str) -> Result<(), StoreError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Rejected("empty query text".to_string()));
    }

    let body = trimmed.trim_end_matches(';').trim_end();
    if body.is_empty() {
        return Err(StoreError::Rejected("empty query text".to_string()));
    }
    if body.contains(';') {
        return Err(StoreError::Rejected(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let leading = body
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if leading != "SELECT" && leading != "WITH" {
        return Err(StoreError::Rejected(format!(
            "only read-only SELECT statements are allowed, got '{}'",
            leading
        )));
    }

    Ok(())
}
