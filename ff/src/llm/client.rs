//! LLM client trait

use async_trait::async_trait;

use super::error::LlmError;
use super::types::{ChatMessage, Completion};

/// A chat-completion transport
///
/// Implementations hold no mutable state between calls and may be
/// shared freely across runners.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run the conversation to a finished completion.
    ///
    /// Transports that stream are expected to fully drain the stream
    /// and, where the vendor reports truncation, resume until a
    /// terminal finish reason or a configured ceiling.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, LlmError>;
}
