//! Domain types for tasks, templates, workflows and steps
//!
//! These are the persisted shapes of the configuration documents plus
//! the transient run-state records. Serialization follows the document
//! convention (camelCase fields, tolerant loads via defaults).

mod document;
mod id;
mod step;
mod task;
mod template;
mod workflow;

pub use document::StreamDocument;
pub use id::generate_id;
pub use step::{
    Endpoint, FileInput, ModelKind, PromptInput, Step, StepConfig, StepData, StepId, StepResult,
    StepStatus,
};
pub use task::{ExecutionResults, Task, TaskExecution, TaskStatus};
pub use template::Template;
pub use workflow::Workflow;
