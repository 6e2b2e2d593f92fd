//! Groq bridge: OpenAI-compatible chat completions over HTTPS.
//!
//! One endpoint serves chat replies, emotion classification, and insight
//! generation; only the message content and decoding parameters differ.
//! Every consumer reaches it through the [`ChatCompletion`] trait so tests
//! can substitute a scripted model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DiaryConfig;
use crate::error::{DiaryError, DiaryResult};

/// One role-tagged message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// The external language-model endpoint: ordered role-tagged messages in,
/// one generated text out. Raises [`DiaryError::UpstreamUnavailable`] or
/// [`DiaryError::MalformedUpstreamResponse`] on failure; callers decide the
/// fallback.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> DiaryResult<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionChoiceMessage,
}

#[derive(Deserialize)]
struct CompletionChoiceMessage {
    content: String,
}

/// Reqwest client for the Groq chat-completions API. The client timeout is
/// the only cancellation contract: expiry surfaces as `UpstreamUnavailable`
/// and triggers the caller's fallback.
pub struct GroqBridge {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GroqBridge {
    /// Build a bridge from config. Returns `None` when no API key is set, so
    /// callers wire in their offline fallback instead.
    pub fn from_config(config: &DiaryConfig) -> Option<Self> {
        let key = config.groq_api_key.as_deref()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(
            key,
            config.groq_model.clone(),
            config.api_base.clone(),
            Duration::from_secs(config.request_timeout_s),
        ))
    }

    pub fn new(api_key: String, model: String, api_base: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl ChatCompletion for GroqBridge {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> DiaryResult<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
        };

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DiaryError::UpstreamUnavailable(format!("model request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            tracing::warn!(target: "diary::llm", %status, "model API returned error status");
            return Err(DiaryError::UpstreamUnavailable(format!(
                "model API error {status}"
            )));
        }

        let parsed: CompletionResponse = res.json().await.map_err(|e| {
            DiaryError::MalformedUpstreamResponse(format!("completion decode failed: {e}"))
        })?;

        parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                DiaryError::MalformedUpstreamResponse("empty completion choices".to_string())
            })
    }
}
