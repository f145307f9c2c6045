//! Engine error taxonomy
//!
//! Every failure a step or control operation can hit maps onto one of
//! these variants. Step-level failures are folded into a `StepResult`
//! by the executor and never cross the runner boundary as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

/// Errors raised by the engine, the scheduler and the stores
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or contradictory step configuration, bad prompt
    /// reference, or a dependency graph that is not a DAG
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A declared dependency has no usable result at execution time
    #[error("dependency not satisfied: {0}")]
    DependencyMissing(String),

    /// A named input file does not exist on disk
    #[error("input file not found: {}", .0.display())]
    InputMissing(PathBuf),

    /// Transport failure or malformed payload from the LLM endpoint
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    /// Output write or directory creation failure
    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Admission refused: the scheduler pool is full
    #[error("concurrency limit reached: {limit} tasks already running")]
    ConcurrencyLimit { limit: usize },

    /// A referenced task, workflow or document does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A stop signal was observed; an interruption, not a failure
    #[error("cancelled")]
    Cancelled,
}

impl EngineError {
    /// Build an `Io` variant tagged with the offending path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error represents an interruption rather than a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
