//! FlowForge configuration types and loading
//!
//! Configuration resolves once at startup: an optional YAML file, then
//! environment overrides. Components receive the resolved struct at
//! construction and never read the environment per call.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulerConfig;

/// Main FlowForge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP control API settings
    pub server: ServerConfig,

    /// LLM endpoint configuration
    pub llm: LlmConfig,

    /// Task scheduling limits and pacing
    pub scheduler: SchedulerConfig,

    /// Persistence locations
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration with fallback chain, then apply environment
    /// overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .flowforge.yml
        let local_config = PathBuf::from(".flowforge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/flowforge/flowforge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("flowforge").join("flowforge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment variable overrides onto the loaded values
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("CHAT_API_URL") {
            self.llm.relay.chat_url = url;
        }
        if let Ok(url) = std::env::var("GENERATE_REACT_API_URL") {
            self.llm.relay.generate_react_url = url;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            self.llm.qianwen.model = model;
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE") {
            self.llm.qianwen.base_url = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL_CODER") {
            self.llm.deepseek.model = model;
        }
        if let Ok(base) = std::env::var("OPENAI_API_BASE_CODER") {
            self.llm.deepseek.base_url = base;
        }
    }
}

/// HTTP control API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port for the control API
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3001 }
    }
}

/// LLM endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ceiling on continuation rounds after truncated streams
    #[serde(rename = "max-continuations")]
    pub max_continuations: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Session-based chat relay endpoints
    pub relay: RelayConfig,

    /// Direct streaming model (general)
    pub qianwen: ModelConfig,

    /// Direct streaming model (code-specialized)
    pub deepseek: ModelConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_continuations: 8,
            timeout_ms: 300_000,
            relay: RelayConfig::default(),
            qianwen: ModelConfig {
                model: "qwen-max".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                base_url: "https://dashscope.aliyuncs.com/compatible-mode".to_string(),
            },
            deepseek: ModelConfig {
                model: "deepseek-coder".to_string(),
                api_key_env: "OPENAI_API_KEY_CODER".to_string(),
                base_url: "https://api.deepseek.com".to_string(),
            },
        }
    }
}

/// Chat relay endpoint URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Plain chat endpoint
    #[serde(rename = "chat-url")]
    pub chat_url: String,

    /// Code-generation passthrough endpoint
    #[serde(rename = "generate-react-url")]
    pub generate_react_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chat_url: "http://localhost:3002/api/chat".to_string(),
            generate_react_url: "http://localhost:3002/api/generate-react".to_string(),
        }
    }
}

/// One direct-streaming model endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (the client appends `/v1/chat/completions`)
    #[serde(rename = "base-url")]
    pub base_url: String,
}

/// Persistence locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the configuration documents
    #[serde(rename = "config-dir")]
    pub config_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("configs"),
        }
    }
}
