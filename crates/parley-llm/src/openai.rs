//! HTTP completion engine for OpenAI-compatible chat endpoints.
//!
//! Talks to a `/v1/chat/completions`-shaped API directly over reqwest.
//! Configuration priority: explicit constructor arguments > environment.

use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_core::config::LlmConfig;

use crate::engine::{CompletionEngine, CompletionOptions};
use crate::error::LlmError;

/// Completion engine backed by an OpenAI-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletion {
    /// Create a new engine with explicit credentials.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build an engine from configuration, reading the API key from the
    /// environment variable the config names.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            LlmError::Config(format!(
                "API key not found in environment variable {}",
                config.api_key_env
            ))
        })?;
        Ok(Self::new(&config.base_url, api_key, &config.model))
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| LlmError::Request {
                status: None,
                message: format!("completion request failed: {err}"),
                retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Malformed(err.to_string()))?;

        let text = extract_text(parsed)?;
        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }
}

#[async_trait]
impl CompletionEngine for OpenAiCompletion {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };

        self.send_request(&request).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text(response: ChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyOutput)
}

fn map_http_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    LlmError::Request {
        status: Some(status.as_u16()),
        message,
        retryable,
    }
}
