//! Direct-model streaming client
//!
//! Speaks OpenAI-style streaming chat-completion over SSE. Token deltas
//! are concatenated until a `finish_reason` arrives; a `length` reason
//! triggers the continuation protocol: the accumulated assistant text
//! plus a fixed continue-prompt are appended and the request re-issued,
//! up to a configured ceiling.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{CONTINUE_PROMPT, ChatMessage, Completion, FinishReason};
use crate::config::ModelConfig;

/// One streamed request-response exchange
///
/// Split from [`LlmClient`] so the continuation loop can be driven
/// against a scripted transport in tests.
#[async_trait]
pub(crate) trait StreamOnce: Send + Sync {
    async fn stream_once(&self, messages: &[ChatMessage]) -> Result<(String, FinishReason), LlmError>;
}

/// Drive a transport to a finished completion, resuming on truncation.
///
/// Every resumption appends the full accumulated assistant text and the
/// continue-prompt to the conversation. When the ceiling is hit without
/// a terminal reason the accumulated text is still returned, with a
/// warning for the caller to surface.
pub(crate) async fn complete_with_continuations<T: StreamOnce + ?Sized>(
    transport: &T,
    messages: Vec<ChatMessage>,
    ceiling: u32,
) -> Result<Completion, LlmError> {
    let mut convo = messages;
    let mut full = String::new();
    let mut continuations = 0u32;

    loop {
        let (text, reason) = transport.stream_once(&convo).await?;
        full.push_str(&text);

        if reason.is_terminal() {
            return Ok(Completion {
                content: full,
                finish_reason: reason,
                warning: None,
            });
        }

        if continuations >= ceiling {
            warn!(ceiling, "continuation ceiling reached without a terminal finish reason");
            return Ok(Completion {
                content: full,
                finish_reason: reason,
                warning: Some(format!(
                    "continuation ceiling of {} reached before a terminal finish reason",
                    ceiling
                )),
            });
        }

        continuations += 1;
        debug!(continuations, accumulated = full.len(), "resuming truncated completion");
        convo.push(ChatMessage::assistant(full.clone()));
        convo.push(ChatMessage::user(CONTINUE_PROMPT));
    }
}

/// OpenAI-compatible streaming client
pub struct DirectClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_continuations: u32,
}

impl DirectClient {
    /// Create a new client from model configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &ModelConfig, timeout: Duration, max_continuations: u32) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::NotConfigured(format!("environment variable {} not set", config.api_key_env)))?;

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.clone(),
            http,
            max_continuations,
        })
    }

    /// Build the streaming request body
    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        })
    }
}

#[async_trait]
impl StreamOnce for DirectClient {
    async fn stream_once(&self, messages: &[ChatMessage]) -> Result<(String, FinishReason), LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(messages);

        let request = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body);

        let mut es = EventSource::new(request).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let mut content = String::new();
        let mut finish: Option<FinishReason> = None;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.trim() == "[DONE]" {
                        break;
                    }
                    let chunk: StreamChunk = serde_json::from_str(&msg.data)?;
                    if let Some(choice) = chunk.choices.first() {
                        if let Some(delta) = &choice.delta.content {
                            content.push_str(delta);
                        }
                        // delta.reasoning_content is diagnostic only and discarded
                        if let Some(reason) = &choice.finish_reason {
                            finish = Some(FinishReason::from_wire(reason));
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let message = response.text().await.unwrap_or_default();
                    es.close();
                    return Err(LlmError::Api {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    es.close();
                    return Err(LlmError::InvalidResponse(e.to_string()));
                }
            }
        }
        es.close();

        match finish {
            Some(reason) => Ok((content, reason)),
            // Some gateways close the stream without a final reason
            None if !content.is_empty() => Ok((content, FinishReason::Stop)),
            None => Err(LlmError::InvalidResponse(
                "stream ended without content or a finish reason".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LlmClient for DirectClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, LlmError> {
        debug!(model = %self.model, messages = messages.len(), "direct: completion requested");
        complete_with_continuations(self, messages, self.max_continuations).await
    }
}

// Streaming wire types

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    #[allow(dead_code)]
    reasoning_content: Option<String>,
}
