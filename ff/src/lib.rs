//! FlowForge - batch orchestrator for LLM-assisted code transformation
//!
//! A task is a reusable template instantiated over many source files;
//! every task is a set of workflows, and every workflow is a DAG of
//! steps. A step reads its inputs, renders a prompt, calls an LLM
//! endpoint, extracts the fenced code from the reply and writes it to
//! disk for downstream steps to consume.
//!
//! # Modules
//!
//! - [`domain`] - tasks, templates, workflows, steps and their results
//! - [`llm`] - chat-relay and direct-streaming clients with continuation
//! - [`content`] - filesystem reads, atomic writes, recursive listing
//! - [`engine`] - graph ordering, step execution, workflow runs
//! - [`runner`] - sequential task execution with progress and timing
//! - [`scheduler`] - bounded admission, batch execution, stop control
//! - [`materialize`] - template expansion across selected source files
//! - [`server`] - the HTTP control API
//! - [`config`] - configuration types and loading

pub mod cli;
pub mod config;
pub mod content;
pub mod domain;
pub mod engine;
pub mod error;
pub mod llm;
pub mod materialize;
pub mod runner;
pub mod scheduler;
pub mod server;
pub mod stop;

// Re-export commonly used types
pub use config::Config;
pub use content::ContentStore;
pub use domain::{
    Endpoint, FileInput, ModelKind, PromptInput, Step, StepConfig, StepData, StepResult, StepStatus,
    StreamDocument, Task, TaskExecution, TaskStatus, Template, Workflow,
};
pub use engine::{ExecutionPolicy, RunState, StepExecutor, WorkflowOutcome, WorkflowRunner};
pub use error::EngineError;
pub use llm::{ChatMessage, Completion, FinishReason, LlmClient, LlmError, LlmRouter};
pub use materialize::{MaterializeOptions, Selection, materialize};
pub use runner::{TaskReport, TaskRunner};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats};
pub use server::{AppState, router, serve};
pub use stop::StopToken;
