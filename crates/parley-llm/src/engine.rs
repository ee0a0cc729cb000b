//! The completion-engine contract.
//!
//! One method, one options struct. Implementations live in [`crate::openai`]
//! (HTTP) and [`crate::fake`] (deterministic, for tests).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;

/// Per-call sampling and budget options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature. The pipeline always uses 0.0 for determinism.
    pub temperature: f32,
    /// Maximum number of output tokens to generate.
    pub max_output_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 400,
        }
    }
}

/// A natural-language completion engine consumed as a pure function.
///
/// Callers must treat every error as a degraded-but-recoverable outcome;
/// no pipeline stage may let an `LlmError` escape a turn.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Turn a prompt into generated text.
    async fn complete(&self, prompt: &str, options: &CompletionOptions)
        -> Result<String, LlmError>;
}

/// Wraps any engine with a per-call deadline.
///
/// A call that exceeds the deadline resolves to [`LlmError::Timeout`] rather
/// than blocking the session indefinitely.
pub struct BoundedCompletion {
    inner: Arc<dyn CompletionEngine>,
    timeout: Duration,
}

impl BoundedCompletion {
    pub fn new(inner: Arc<dyn CompletionEngine>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl CompletionEngine for BoundedCompletion {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(self.timeout, self.inner.complete(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEngine {
        delay: Duration,
    }

    #[async_trait]
    impl CompletionEngine for SlowEngine {
        async fn complete(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> Result<String, LlmError> {
            tokio::time::sleep(self.delay).await;
            Ok("late answer".to_string())
        }
    }

    #[tokio::test]
    async fn test_bounded_passes_through_fast_calls() {
        let engine = BoundedCompletion::new(
            Arc::new(SlowEngine {
                delay: Duration::from_millis(5),
            }),
            Duration::from_secs(1),
        );
        let out = engine
            .complete("q", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "late answer");
    }

    #[tokio::test]
    async fn test_bounded_times_out_slow_calls() {
        let engine = BoundedCompletion::new(
            Arc::new(SlowEngine {
                delay: Duration::from_secs(5),
            }),
            Duration::from_millis(20),
        );
        let result = engine.complete("q", &CompletionOptions::default()).await;
        assert!(matches!(result, Err(LlmError::Timeout(_))));
    }

    #[test]
    fn test_default_options() {
        let opts = CompletionOptions::default();
        assert_eq!(opts.temperature, 0.0);
        assert_eq!(opts.max_output_tokens, 400);
    }
}
