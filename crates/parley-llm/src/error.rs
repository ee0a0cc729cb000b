//! Error types for the completion engine.

use std::time::Duration;

use parley_core::error::CoreError;

/// Errors from a completion engine call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),
    #[error("completion request failed: {message}")]
    Request {
        status: Option<u16>,
        message: String,
        retryable: bool,
    },
    #[error("completion returned no content")]
    EmptyOutput,
    #[error("completion response malformed: {0}")]
    Malformed(String),
    #[error("completion engine misconfigured: {0}")]
    Config(String),
}

impl From<LlmError> for CoreError {
    fn from(err: LlmError) -> Self {
        CoreError::Llm(err.to_string())
    }
}
