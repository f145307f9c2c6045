//! Step: one LLM-backed transformation unit
//!
//! A step reads its inputs (literal paths or upstream outputs), renders
//! a prompt, calls an LLM endpoint, and writes the extracted code to
//! `outputFolder/outputFileName`. Runtime `status`/`result` never reach
//! the persisted document; the config store strips them on save.

use serde::{Deserialize, Serialize};

/// Stable step identifier, unique within its workflow
pub type StepId = String;

/// Step lifecycle status
///
/// Transitions: `pending → running → {success, error, skipped}`; a
/// reset moves a terminal status back to `pending`. `running` exists
/// only mid-execution and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

impl StepStatus {
    /// Whether the step has reached a terminal state for this run
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Skipped)
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Which LLM transport a step talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// Session-based chat relay; no streaming, no continuation
    #[default]
    ChatRelay,
    /// Direct streaming chat-completion against a vendor model
    DirectStream(ModelKind),
}

/// Model family behind the direct-streaming transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Qianwen,
    Deepseek,
}

impl Endpoint {
    /// Document-level name of this endpoint
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatRelay => "chat",
            Self::DirectStream(ModelKind::Qianwen) => "qianwen",
            Self::DirectStream(ModelKind::Deepseek) => "deepseek",
        }
    }
}

impl std::str::FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(Self::ChatRelay),
            "qianwen" => Ok(Self::DirectStream(ModelKind::Qianwen)),
            "deepseek" => Ok(Self::DirectStream(ModelKind::Deepseek)),
            other => Err(format!(
                "unknown api endpoint: '{}'. Supported: chat, qianwen, deepseek",
                other
            )),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Endpoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Endpoint {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One named file input of a step
///
/// Exactly one of `path` or `depends_on` is effective: when
/// `depends_on` names an upstream step, the literal path is ignored and
/// the upstream `StepResult.data.path` is consumed instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<StepId>,
}

/// One prompt fragment; `content` may reference file inputs as `{{name}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptInput {
    pub content: String,
    #[serde(default)]
    pub file_references: Vec<String>,
}

/// Static configuration of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StepConfig {
    pub file_inputs: Vec<FileInput>,
    pub prompt_inputs: Vec<PromptInput>,
    pub output_folder: String,
    pub output_file_name: String,
    pub api_endpoint: Endpoint,
}

/// A workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    pub order: u32,
    #[serde(default)]
    pub dependencies: Vec<StepId>,
    #[serde(default)]
    pub config: StepConfig,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StepResult>,
}

/// Output descriptor published by a successful step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StepData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Runtime outcome of a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StepData>,
}

impl StepResult {
    /// Successful result carrying the output descriptor
    pub fn ok(message: impl Into<String>, data: StepData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Failed result; the message is what the live view shows
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// The canonical handle downstream steps consume
    pub fn output_path(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.path.as_deref()).filter(|p| !p.is_empty())
    }
}
