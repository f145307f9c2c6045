//! Chat-relay client
//!
//! Talks to an external session-based chat endpoint: POST
//! `{message, sessionId}`, receive `{reply}`. No streaming and no
//! continuation; a relay reply is always a complete turn.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::LlmClient;
use super::error::LlmError;
use super::types::{ChatMessage, Completion, FinishReason, Role};
use crate::config::RelayConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 500;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Session-based chat relay client
pub struct RelayClient {
    chat_url: String,
    react_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    reply: String,
}

impl RelayClient {
    /// Create a new client from configuration
    pub fn from_config(config: &RelayConfig, timeout: Duration) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;
        Ok(Self {
            chat_url: config.chat_url.clone(),
            react_url: config.generate_react_url.clone(),
            http,
        })
    }

    /// Send one chat message within a session
    pub async fn chat(&self, message: &str, session_id: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({ "message": message, "sessionId": session_id });
        self.post_relay(&self.chat_url, body).await
    }

    /// Pass a message through the code-generation relay endpoint
    pub async fn react(
        &self,
        message: &str,
        session_id: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let mut body = serde_json::json!({ "message": message, "sessionId": session_id });
        if let Some(prompt) = system_prompt {
            body["systemPrompt"] = serde_json::json!(prompt);
        }
        self.post_relay(&self.react_url, body).await
    }

    async fn post_relay(&self, url: &str, body: serde_json::Value) -> Result<String, LlmError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "relay: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.http.post(url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "relay: network error");
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if is_retryable_status(status) && attempt < MAX_RETRIES {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "relay: retryable error");
                last_error = Some(LlmError::Api { status, message: text });
                continue;
            }

            if !response.status().is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Api { status, message: text });
            }

            let reply: RelayReply = response.json().await?;
            debug!(reply_len = reply.reply.len(), "relay: reply received");
            return Ok(reply.reply);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("max retries exceeded".to_string())))
    }
}

#[async_trait]
impl LlmClient for RelayClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, LlmError> {
        // The relay takes a single flattened message per call; the
        // session id isolates it from unrelated conversations.
        let message = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let session_id = uuid::Uuid::now_v7().to_string();
        let reply = self.chat(&message, &session_id).await?;
        Ok(Completion::new(reply, FinishReason::Stop))
    }
}
