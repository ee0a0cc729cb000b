//! Error types for the data store.

use parley_core::error::CoreError;

/// Errors from the relational data store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("query rejected: {0}")]
    Rejected(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("schema error: {0}")]
    Schema(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Store(err.to_string())
    }
}
