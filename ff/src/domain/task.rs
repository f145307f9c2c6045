//! Task: a runnable instance of a template (the user-facing unit of work)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::template::Template;

/// Task lifecycle status
///
/// `running` is runtime-only; the config store reverts it to `idle` on
/// save so a restarted process always loads a cold pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Aggregate outcome of a task's most recent execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionResults {
    pub total_workflows: usize,
    pub completed_workflows: usize,
    pub failed_workflows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
}

/// A task ("workflow group"): a template instance plus its run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<ExecutionResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Whether the scheduler will admit this task into a batch
    pub fn is_executable(&self) -> bool {
        self.status == TaskStatus::Idle && self.template.is_executable()
    }
}

/// Ephemeral execution record, alive only while a task runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExecution {
    pub task_id: String,
    pub is_running: bool,
    /// Completion ratio in `0..=1`, stepped per finished workflow
    pub progress: f64,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub current_workflow_index: usize,
    pub total_workflows: usize,
}

impl TaskExecution {
    /// Fresh record for a task entering execution
    pub fn begin(task_id: impl Into<String>, total_workflows: usize) -> Self {
        Self {
            task_id: task_id.into(),
            is_running: true,
            progress: 0.0,
            start_time: Utc::now(),
            end_time: None,
            current_workflow_index: 0,
            total_workflows,
        }
    }

    /// Mark the execution finished
    pub fn finish(&mut self) {
        self.is_running = false;
        self.end_time = Some(Utc::now());
    }
}
