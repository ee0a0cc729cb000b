//! Error types for the conversational front-end.
//!
//! Only message validation surfaces to callers; every pipeline-internal
//! failure degrades to a textual answer instead.

use parley_core::error::CoreError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat is disabled")]
    Disabled,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session registry error: {0}")]
    Registry(String),
}

impl From<ChatError> for CoreError {
    fn from(err: ChatError) -> Self {
        CoreError::Session(err.to_string())
    }
}
