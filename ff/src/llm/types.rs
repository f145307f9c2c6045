//! Conversation and completion types shared by every LLM transport

use serde::{Deserialize, Serialize};

/// Prompt sent when a truncated stream must be resumed. The assistant's
/// accumulated text is appended first, then this instruction.
pub const CONTINUE_PROMPT: &str = "Continue directly from the previous content, ensure seamless \
     continuation, correct syntax, no repetition, do not acknowledge — just continue.";

/// Chat roles on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Why the model stopped emitting tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of turn
    Stop,
    /// Token budget exhausted; the continuation protocol applies
    Length,
    ToolCalls,
    ContentFilter,
    /// Vendor-specific reason passed through verbatim
    Other(String),
}

impl FinishReason {
    /// Map a vendor finish-reason string onto the closed set
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "tool_calls" | "tool_use" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    /// Terminal reasons end the continuation loop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Length)
    }
}

/// Assembled result of one `complete` call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Full concatenated assistant text across all continuations
    pub content: String,
    pub finish_reason: FinishReason,
    /// Non-fatal note, e.g. the continuation ceiling was reached
    pub warning: Option<String>,
}

impl Completion {
    pub fn new(content: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            content: content.into(),
            finish_reason,
            warning: None,
        }
    }
}
