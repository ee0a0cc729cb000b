//! Deterministic completion engine for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::{CompletionEngine, CompletionOptions};
use crate::error::LlmError;

/// A scripted engine that replays a fixed sequence of responses.
///
/// Each call pops the next scripted item; when the script is exhausted the
/// engine keeps returning the final item. An `Err` item simulates a
/// timeout/quota failure at that position in the conversation.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    /// Create an engine replaying the given responses in order.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script: VecDeque<Result<String, String>> =
            responses.into_iter().map(|s| Ok(s.into())).collect();
        Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create an engine that fails every call with the given reason.
    pub fn failing(reason: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(Some(Err(reason.to_string()))),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Append a failure at the current end of the script.
    pub fn push_failure(self, reason: &str) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(reason.to_string()));
        }
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionEngine for ScriptedCompletion {
    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = {
            let mut script = self
                .script
                .lock()
                .map_err(|e| LlmError::Config(format!("script lock poisoned: {}", e)))?;
            match script.pop_front() {
                Some(item) => {
                    if let Ok(mut last) = self.last.lock() {
                        *last = Some(item.clone());
                    }
                    Some(item)
                }
                None => self.last.lock().ok().and_then(|l| l.clone()),
            }
        };

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(LlmError::Request {
                status: None,
                message: reason,
                retryable: false,
            }),
            None => Err(LlmError::EmptyOutput),
        }
    }
}
