//! Scheduler implementation
//!
//! Admits tasks into a process-wide pool bounded by
//! `max_concurrent_tasks`. Admission beyond the cap is rejected, not
//! queued; the batch path drains an idle-task queue with a fixed pool
//! of workers instead. All state is in-process: a restart reloads every
//! task idle because the config store strips runtime status.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

use crate::domain::{Task, TaskExecution};
use crate::engine::StepExecutor;
use crate::error::EngineError;
use crate::runner::{TaskReport, TaskRunner};
use crate::stop::StopToken;

use super::config::SchedulerConfig;

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub total_scheduled: u64,
    pub total_completed: u64,
    pub peak_concurrent: usize,
}

/// A task currently holding a pool slot
struct RunningTask {
    stop: StopToken,
    execution: Arc<Mutex<TaskExecution>>,
}

/// Internal state protected by mutex
struct SchedulerInner {
    running: HashMap<String, RunningTask>,
    stats: SchedulerStats,
}

/// Process-wide task scheduler
pub struct Scheduler {
    config: SchedulerConfig,
    runner: TaskRunner,
    inner: Mutex<SchedulerInner>,
    notify: Notify,
}

impl Scheduler {
    /// Create a scheduler around a shared step executor
    pub fn new(config: SchedulerConfig, executor: Arc<StepExecutor>) -> Self {
        let runner = TaskRunner::new(executor, Duration::from_millis(config.inter_workflow_delay_ms));
        Self {
            config,
            runner,
            inner: Mutex::new(SchedulerInner {
                running: HashMap::new(),
                stats: SchedulerStats::default(),
            }),
            notify: Notify::new(),
        }
    }

    /// Claim a pool slot for a task
    ///
    /// Fails with `ConcurrencyLimit` when the pool is full and with
    /// `ConfigInvalid` when the task is already running.
    async fn admit(&self, task: &Task) -> Result<(StopToken, Arc<Mutex<TaskExecution>>), EngineError> {
        let mut inner = self.inner.lock().await;

        if inner.running.contains_key(&task.id) {
            return Err(EngineError::ConfigInvalid(format!(
                "task '{}' is already running",
                task.id
            )));
        }
        if inner.running.len() >= self.config.max_concurrent_tasks {
            return Err(EngineError::ConcurrencyLimit {
                limit: self.config.max_concurrent_tasks,
            });
        }

        let stop = StopToken::new();
        let execution = Arc::new(Mutex::new(TaskExecution::begin(
            task.id.as_str(),
            task.template.ordered_workflows().len(),
        )));

        inner.running.insert(
            task.id.clone(),
            RunningTask {
                stop: stop.clone(),
                execution: Arc::clone(&execution),
            },
        );
        inner.stats.total_scheduled += 1;
        inner.stats.peak_concurrent = inner.stats.peak_concurrent.max(inner.running.len());

        debug!(task = %task.id, running = inner.running.len(), "task admitted");
        Ok((stop, execution))
    }

    /// Release a pool slot and wake admission waiters
    async fn release(&self, task_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.running.remove(task_id);
        inner.stats.total_completed += 1;
        debug!(task = %task_id, running = inner.running.len(), "task released");
        drop(inner);

        self.notify.notify_waiters();
    }

    /// Execute one task to completion under the admission cap
    pub async fn execute(&self, task: &Task) -> Result<TaskReport, EngineError> {
        let (stop, execution) = self.admit(task).await?;
        let report = self.runner.run(task, execution, &stop).await;
        self.release(&task.id).await;
        Ok(report)
    }

    /// Execute every executable task of a batch.
    ///
    /// Spawns up to `max_concurrent_tasks` workers; each pulls the next
    /// idle task until the queue drains, pausing briefly between its
    /// tasks. Returns per-task reports in completion order.
    pub async fn execute_all(self: &Arc<Self>, tasks: Vec<Task>) -> Vec<(String, TaskReport)> {
        let executable: VecDeque<Task> = tasks.into_iter().filter(|t| t.is_executable()).collect();
        if executable.is_empty() {
            return Vec::new();
        }

        info!(tasks = executable.len(), "batch execution started");

        let worker_count = self.config.max_concurrent_tasks.min(executable.len());
        let queue = Arc::new(Mutex::new(executable));
        let results = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::with_capacity(worker_count);
        for worker in 0..worker_count {
            let scheduler = Arc::clone(self);
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);

            handles.push(tokio::spawn(async move {
                loop {
                    let task = queue.lock().await.pop_front();
                    let Some(task) = task else { break };

                    debug!(worker, task = %task.id, "worker picked task");
                    match scheduler.execute(&task).await {
                        Ok(report) => {
                            results.lock().await.push((task.id.clone(), report));
                        }
                        Err(EngineError::ConcurrencyLimit { .. }) => {
                            // Slots taken by tasks outside this batch;
                            // requeue and wait for one to free up.
                            queue.lock().await.push_front(task);
                            scheduler.notify.notified().await;
                            continue;
                        }
                        Err(e) => {
                            warn!(task = %task.id, error = %e, "batch task rejected");
                        }
                    }

                    tokio::time::sleep(Duration::from_millis(scheduler.config.inter_task_delay_ms)).await;
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let reports = std::mem::take(&mut *results.lock().await);
        info!(completed = reports.len(), "batch execution finished");
        reports
    }

    /// Signal one running task to stop; returns whether it was running
    pub async fn stop(&self, task_id: &str) -> bool {
        let inner = self.inner.lock().await;
        match inner.running.get(task_id) {
            Some(running) => {
                info!(task = %task_id, "stop requested");
                running.stop.trigger();
                true
            }
            None => false,
        }
    }

    /// Signal every running task to stop and wait until all slots drain
    pub async fn stop_all(&self) {
        {
            let inner = self.inner.lock().await;
            info!(running = inner.running.len(), "stopping all tasks");
            for running in inner.running.values() {
                running.stop.trigger();
            }
        }

        loop {
            let notified = self.notify.notified();
            if self.inner.lock().await.running.is_empty() {
                break;
            }
            notified.await;
        }
    }

    /// Snapshot of a running task's execution record
    pub async fn execution(&self, task_id: &str) -> Option<TaskExecution> {
        let inner = self.inner.lock().await;
        match inner.running.get(task_id) {
            Some(running) => Some(running.execution.lock().await.clone()),
            None => None,
        }
    }

    /// Number of tasks currently holding slots
    pub async fn running_count(&self) -> usize {
        self.inner.lock().await.running.len()
    }

    /// Counter snapshot
    pub async fn stats(&self) -> SchedulerStats {
        self.inner.lock().await.stats.clone()
    }
}
