//! OpenAI-compatible inference client.
//!
//! Sends non-streaming chat completion requests to a local LLM endpoint
//! (LM Studio by default). There is no retry and no fallback chain: a failed
//! request surfaces as an error to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::errors::InferenceError;
use super::response::parse_completion_response;
use super::types::{AssistantReply, ChatCompletionRequest, ChatMessage, ToolDefinition};
use crate::config::{InferenceConfig, DEFAULT_MODEL};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Timeout for the `/models` probe. Completions have no timeout unless configured.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ─── CompletionBackend ───────────────────────────────────────────────────────

/// Anything that can answer a chat completion request with the tool schema attached.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Option<AssistantReply>, InferenceError>;
}

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the local LLM inference endpoint.
pub struct InferenceClient {
    http: HttpClient,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: Option<u64>,
    probe_timeout: Duration,
}

impl InferenceClient {
    /// Create a new inference client. Does NOT check connectivity.
    pub fn from_config(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let mut builder = HttpClient::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.request_timeout_secs,
            probe_timeout: PROBE_TIMEOUT,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a non-streaming chat completion request.
    ///
    /// Returns `Ok(None)` when the server answers with no choices.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<Option<AssistantReply>, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            tool_count = body.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            max_tokens = body.max_tokens,
            "=== LLM REQUEST ==="
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(&url, e, self.timeout_secs.unwrap_or_default()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "completion request rejected");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| InferenceError::ResponseError {
            reason: format!("failed to read response body: {e}"),
        })?;

        let reply = parse_completion_response(&body_text)?;
        if let Some(ref r) = reply {
            tracing::info!(
                tool_calls = r.tool_calls.len(),
                finish_reason = ?r.finish_reason,
                "=== LLM RESPONSE ==="
            );
        }
        Ok(reply)
    }

    // ─── Models ──────────────────────────────────────────────────────────

    /// List the model ids the server offers.
    ///
    /// Never fails: on any error the default model is returned so callers
    /// always have something to show.
    pub async fn list_models(&self) -> Vec<String> {
        match self.fetch_models().await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch models, using default");
                vec![DEFAULT_MODEL.to_string()]
            }
        }
    }

    async fn fetch_models(&self) -> Result<Vec<String>, InferenceError> {
        #[derive(Deserialize)]
        struct ModelList {
            data: Vec<ModelEntry>,
        }

        #[derive(Deserialize)]
        struct ModelEntry {
            id: String,
        }

        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| map_send_error(&url, e, self.probe_timeout.as_secs()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let list: ModelList = response.json().await.map_err(|e| InferenceError::ResponseError {
            reason: format!("failed to parse model list: {e}"),
        })?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    // ─── Health Check ────────────────────────────────────────────────────

    /// Check if the model endpoint is reachable. Does not consume tokens.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        match self.http.get(&url).timeout(self.probe_timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

fn map_send_error(url: &str, e: reqwest::Error, duration_secs: u64) -> InferenceError {
    if e.is_timeout() {
        InferenceError::Timeout { duration_secs }
    } else {
        InferenceError::ConnectionFailed {
            endpoint: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for InferenceClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<Option<AssistantReply>, InferenceError> {
        let tools = if tools.is_empty() { None } else { Some(tools) };
        self.chat_completion(messages, tools).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
