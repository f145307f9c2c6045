//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Concurrency and pacing limits for task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Process-wide cap on concurrently executing tasks
    #[serde(rename = "max-concurrent-tasks")]
    pub max_concurrent_tasks: usize,

    /// Pause between a batch worker's successive tasks
    #[serde(rename = "inter-task-delay-ms")]
    pub inter_task_delay_ms: u64,

    /// Pause between a task's successive workflows
    #[serde(rename = "inter-workflow-delay-ms")]
    pub inter_workflow_delay_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 6,
            inter_task_delay_ms: 200,
            inter_workflow_delay_ms: 500,
        }
    }
}
