//! LLM clients for FlowForge
//!
//! Two transports back the step executor: a session-based chat relay
//! and an OpenAI-style direct streaming client with continuation on
//! truncation. Both are stateless between calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

mod client;
mod direct;
mod error;
mod extract;
mod relay;
mod types;

pub use client::LlmClient;
pub use direct::DirectClient;
pub use error::LlmError;
pub use extract::extract_fenced_code;
pub use relay::RelayClient;
pub use types::{CONTINUE_PROMPT, ChatMessage, Completion, FinishReason, Role};

use crate::config::LlmConfig;
use crate::domain::{Endpoint, ModelKind};

/// Routes a step's endpoint selection to a concrete client
///
/// Direct-model clients require an API key in the environment; when one
/// is missing at construction the variant stays unavailable and calls
/// against it fail with `NotConfigured` instead of taking the process
/// down at startup.
pub struct LlmRouter {
    relay: Arc<dyn LlmClient>,
    qianwen: Option<Arc<dyn LlmClient>>,
    deepseek: Option<Arc<dyn LlmClient>>,
}

impl LlmRouter {
    /// Build the router from resolved configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let timeout = Duration::from_millis(config.timeout_ms);

        let relay: Arc<dyn LlmClient> = Arc::new(RelayClient::from_config(&config.relay, timeout)?);

        let qianwen = match DirectClient::from_config(&config.qianwen, timeout, config.max_continuations) {
            Ok(client) => {
                debug!(model = %config.qianwen.model, "qianwen client ready");
                Some(Arc::new(client) as Arc<dyn LlmClient>)
            }
            Err(e) => {
                warn!(error = %e, "qianwen client unavailable");
                None
            }
        };

        let deepseek = match DirectClient::from_config(&config.deepseek, timeout, config.max_continuations) {
            Ok(client) => {
                debug!(model = %config.deepseek.model, "deepseek client ready");
                Some(Arc::new(client) as Arc<dyn LlmClient>)
            }
            Err(e) => {
                warn!(error = %e, "deepseek client unavailable");
                None
            }
        };

        Ok(Self {
            relay,
            qianwen,
            deepseek,
        })
    }

    /// Assemble a router from pre-built clients (used by tests and by
    /// callers that wrap transports, e.g. with a rate limiter)
    pub fn with_clients(
        relay: Arc<dyn LlmClient>,
        qianwen: Option<Arc<dyn LlmClient>>,
        deepseek: Option<Arc<dyn LlmClient>>,
    ) -> Self {
        Self {
            relay,
            qianwen,
            deepseek,
        }
    }

    /// The client behind an endpoint selection
    pub fn client_for(&self, endpoint: Endpoint) -> Result<Arc<dyn LlmClient>, LlmError> {
        match endpoint {
            Endpoint::ChatRelay => Ok(Arc::clone(&self.relay)),
            Endpoint::DirectStream(ModelKind::Qianwen) => self
                .qianwen
                .as_ref()
                .map(Arc::clone)
                .ok_or_else(|| LlmError::NotConfigured("qianwen".to_string())),
            Endpoint::DirectStream(ModelKind::Deepseek) => self
                .deepseek
                .as_ref()
                .map(Arc::clone)
                .ok_or_else(|| LlmError::NotConfigured("deepseek".to_string())),
        }
    }
}
