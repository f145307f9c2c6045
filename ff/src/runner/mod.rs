//! Task Runner
//!
//! Executes one task's workflows strictly sequentially, stepping the
//! task-level progress per finished workflow and pausing briefly
//! between workflows to avoid hammering the LLM endpoints. A workflow
//! failure is logged and the task continues; a stop signal ends the
//! task at the next boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{ExecutionResults, Task, TaskExecution, TaskStatus};
use crate::engine::{RunState, StepExecutor, WorkflowRunner};
use crate::stop::StopToken;

/// Final report of one task execution
#[derive(Debug, Clone)]
pub struct TaskReport {
    /// Terminal status for the task record
    pub status: TaskStatus,
    /// The run was interrupted by a stop signal
    pub cancelled: bool,
    /// Progress at the end of the run
    pub progress: f64,
    /// Totals and timing for `executionResults`
    pub results: ExecutionResults,
}

impl TaskReport {
    /// Fold this report into a task record (status, progress, results,
    /// update stamp); used by the control API and the CLI before
    /// persisting.
    pub fn apply_to(&self, task: &mut Task) {
        task.status = self.status;
        task.progress = self.progress;
        task.execution_results = Some(self.results.clone());
        task.updated_at = Some(Utc::now());
    }
}

/// Sequential executor for the workflows of one task
pub struct TaskRunner {
    workflow_runner: WorkflowRunner,
    inter_workflow_delay: Duration,
}

impl TaskRunner {
    pub fn new(executor: Arc<StepExecutor>, inter_workflow_delay: Duration) -> Self {
        Self {
            workflow_runner: WorkflowRunner::new(executor),
            inter_workflow_delay,
        }
    }

    /// Run every workflow of the task in template order.
    ///
    /// Terminal status policy: any completed workflow makes the task
    /// `completed` (failures show up in `failedWorkflows`); `failed`
    /// only when every workflow failed; a cancelled task reverts to
    /// `idle`.
    pub async fn run(&self, task: &Task, execution: Arc<Mutex<TaskExecution>>, stop: &StopToken) -> TaskReport {
        let workflows = task.template.ordered_workflows();
        let total = workflows.len();
        let start = Utc::now();

        info!(task = %task.id, workflows = total, "task started");

        let mut completed = 0usize;
        let mut failed = 0usize;
        let mut cancelled = false;

        for (index, workflow) in workflows.iter().enumerate() {
            if stop.is_stopped() {
                cancelled = true;
                break;
            }

            {
                let mut exec = execution.lock().await;
                exec.current_workflow_index = index;
            }

            let mut state = RunState::for_workflow(workflow);
            match self.workflow_runner.run(workflow, &mut state, stop).await {
                Ok(outcome) if outcome.cancelled => {
                    cancelled = true;
                    break;
                }
                Ok(outcome) if outcome.succeeded => {
                    completed += 1;
                }
                Ok(_) => {
                    failed += 1;
                    warn!(task = %task.id, workflow = %workflow.id, "workflow finished with failed steps");
                }
                Err(e) => {
                    failed += 1;
                    warn!(task = %task.id, workflow = %workflow.id, error = %e, "workflow rejected");
                }
            }

            {
                let mut exec = execution.lock().await;
                exec.progress = (index + 1) as f64 / total as f64;
            }

            // Throttle between workflows, not after the last one
            if index + 1 < total && !stop.is_stopped() {
                tokio::time::sleep(self.inter_workflow_delay).await;
            }
        }

        let end = Utc::now();
        let progress = {
            let mut exec = execution.lock().await;
            exec.finish();
            exec.progress
        };

        let status = if cancelled {
            TaskStatus::Idle
        } else if completed > 0 || total == 0 {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };

        info!(task = %task.id, %status, completed, failed, cancelled, "task finished");

        TaskReport {
            status,
            cancelled,
            progress,
            results: ExecutionResults {
                total_workflows: total,
                completed_workflows: completed,
                failed_workflows: failed,
                start_time: Some(start),
                end_time: Some(end),
                duration: (end - start).num_milliseconds().max(0) as u64,
            },
        }
    }
}
