//! Workflow Runner
//!
//! Drives a workflow's steps sequentially in topological order. The
//! persisted workflow stays immutable; all runtime state lives in a
//! `RunState` keyed by step id. Supports full runs and the two partial
//! re-execution operations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Step, StepId, StepResult, StepStatus, Workflow};
use crate::engine::executor::StepExecutor;
use crate::engine::graph::execution_order;
use crate::error::EngineError;
use crate::stop::StopToken;

/// Mutable run state of one workflow: statuses and results per step
///
/// This is the live view; nothing here ever reaches the persisted
/// document.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    statuses: HashMap<StepId, StepStatus>,
    results: HashMap<StepId, StepResult>,
}

impl RunState {
    /// Fresh state with every step pending
    pub fn for_workflow(workflow: &Workflow) -> Self {
        Self {
            statuses: workflow.steps.iter().map(|s| (s.id.clone(), StepStatus::Pending)).collect(),
            results: HashMap::new(),
        }
    }

    pub fn status(&self, step_id: &str) -> StepStatus {
        self.statuses.get(step_id).copied().unwrap_or_default()
    }

    pub fn result(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }

    pub fn results(&self) -> &HashMap<StepId, StepResult> {
        &self.results
    }

    /// Completed steps / total, for progress reporting
    pub fn progress(&self, total: usize) -> f64 {
        if total == 0 {
            return 1.0;
        }
        let done = self.statuses.values().filter(|s| s.is_terminal()).count();
        done as f64 / total as f64
    }

    fn set(&mut self, step_id: &StepId, status: StepStatus, result: Option<StepResult>) {
        self.statuses.insert(step_id.clone(), status);
        match result {
            Some(result) => {
                self.results.insert(step_id.clone(), result);
            }
            None => {
                self.results.remove(step_id);
            }
        }
    }

    /// Reset one step to pending, clearing its result
    fn reset(&mut self, step_id: &str) {
        self.statuses.insert(step_id.to_string(), StepStatus::Pending);
        self.results.remove(step_id);
    }
}

/// Outcome of one workflow run
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// Every step reached `success`
    pub succeeded: bool,
    /// A stop signal interrupted the run
    pub cancelled: bool,
    /// Final progress in `0..=1`
    pub progress: f64,
}

/// Sequential topological driver for one workflow
pub struct WorkflowRunner {
    executor: Arc<StepExecutor>,
    progress_tx: Option<watch::Sender<f64>>,
}

impl WorkflowRunner {
    pub fn new(executor: Arc<StepExecutor>) -> Self {
        Self {
            executor,
            progress_tx: None,
        }
    }

    /// Publish progress values on the given channel after every step
    /// transition
    pub fn with_progress_channel(mut self, tx: watch::Sender<f64>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    fn report(&self, progress: f64) {
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(progress);
        }
    }

    /// Run the whole workflow from a clean state.
    ///
    /// Rejects cyclic or ill-referenced graphs with `ConfigInvalid`
    /// before any step executes. A step whose dependencies are not all
    /// successful is skipped with a message naming the ancestor.
    pub async fn run(
        &self,
        workflow: &Workflow,
        state: &mut RunState,
        stop: &StopToken,
    ) -> Result<WorkflowOutcome, EngineError> {
        let order = execution_order(&workflow.steps)?;

        *state = RunState::for_workflow(workflow);
        self.report(0.0);

        let total = workflow.steps.len();
        info!(workflow = %workflow.id, steps = total, "workflow started");

        let mut cancelled = false;
        for idx in order {
            if stop.is_stopped() {
                cancelled = true;
                break;
            }
            let step = &workflow.steps[idx];
            self.execute_step(step, state, stop).await;
            self.report(state.progress(total));
        }

        let succeeded = !cancelled && workflow.steps.iter().all(|s| state.status(&s.id) == StepStatus::Success);
        let outcome = WorkflowOutcome {
            succeeded,
            cancelled,
            progress: state.progress(total),
        };
        info!(workflow = %workflow.id, succeeded, cancelled, "workflow finished");
        Ok(outcome)
    }

    /// Re-run a single step against the current live view.
    ///
    /// Dependencies that are not in `success` produce a warning but do
    /// not block the run; upstream and downstream state is untouched.
    pub async fn rerun_step(
        &self,
        workflow: &Workflow,
        step_id: &str,
        state: &mut RunState,
        stop: &StopToken,
    ) -> Result<StepResult, EngineError> {
        let step = workflow
            .step(step_id)
            .ok_or_else(|| EngineError::NotFound(format!("step '{}' not in workflow '{}'", step_id, workflow.id)))?;

        for dep in &step.dependencies {
            if state.status(dep) != StepStatus::Success {
                warn!(step = %step_id, dependency = %dep, "re-running step although dependency is not successful");
            }
        }

        // No dependency gate here: a single-step re-run executes
        // against whatever prior results exist.
        state.reset(step_id);
        let result = self.run_step(step, state, stop).await;
        self.report(state.progress(workflow.steps.len()));

        Ok(result)
    }

    /// Re-run a step and everything downstream of it.
    ///
    /// The closure is reset, then executed in topological order; steps
    /// outside it keep their results and satisfy dependencies from the
    /// previous run.
    pub async fn rerun_from(
        &self,
        workflow: &Workflow,
        step_id: &str,
        state: &mut RunState,
        stop: &StopToken,
    ) -> Result<WorkflowOutcome, EngineError> {
        if workflow.step(step_id).is_none() {
            return Err(EngineError::NotFound(format!(
                "step '{}' not in workflow '{}'",
                step_id, workflow.id
            )));
        }

        let order = execution_order(&workflow.steps)?;
        let closure: HashSet<StepId> = workflow.downstream_closure(step_id).into_iter().collect();

        debug!(workflow = %workflow.id, from = %step_id, steps = closure.len(), "partial re-run");
        for id in &closure {
            state.reset(id);
        }

        let total = workflow.steps.len();
        let mut cancelled = false;
        for idx in order {
            let step = &workflow.steps[idx];
            if !closure.contains(&step.id) {
                continue;
            }
            if stop.is_stopped() {
                cancelled = true;
                break;
            }
            self.execute_step(step, state, stop).await;
            self.report(state.progress(total));
        }

        let succeeded = !cancelled && workflow.steps.iter().all(|s| state.status(&s.id) == StepStatus::Success);
        Ok(WorkflowOutcome {
            succeeded,
            cancelled,
            progress: state.progress(total),
        })
    }

    async fn execute_step(&self, step: &Step, state: &mut RunState, stop: &StopToken) {
        // Dependency gate: every ancestor must have succeeded
        if let Some(failed) = step
            .dependencies
            .iter()
            .find(|d| state.status(d) != StepStatus::Success)
        {
            let message = format!("skipped: dependency '{}' did not succeed", failed);
            debug!(step = %step.id, %message);
            state.set(&step.id, StepStatus::Skipped, Some(StepResult::failure(message)));
            return;
        }

        self.run_step(step, state, stop).await;
    }

    async fn run_step(&self, step: &Step, state: &mut RunState, stop: &StopToken) -> StepResult {
        state.set(&step.id, StepStatus::Running, None);
        let result = self.executor.execute(step, state.results(), stop).await;
        let status = if result.success { StepStatus::Success } else { StepStatus::Error };
        state.set(&step.id, status, Some(result.clone()));
        result
    }
}
