//! Completion-engine contract and implementations.
//!
//! The rest of the system consumes natural-language completion through the
//! [`CompletionEngine`] trait only, so deterministic fakes can drive the
//! turn pipeline in tests without network access.

pub mod engine;
pub mod error;
pub mod fake;
pub mod openai;

pub use engine::{BoundedCompletion, CompletionEngine, CompletionOptions};
pub use error::LlmError;
pub use fake::ScriptedCompletion;
pub use openai::OpenAiCompletion;
