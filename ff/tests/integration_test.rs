//! End-to-end tests for the FlowForge engine
//!
//! Drives whole workflows, tasks and batches against a scripted LLM
//! client and temporary directories.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use flowforge::domain::{
    Endpoint, FileInput, PromptInput, Step, StepConfig, Task, TaskStatus, Template, Workflow,
};
use flowforge::engine::{RunState, StepExecutor, WorkflowRunner};
use flowforge::llm::{ChatMessage, Completion, FinishReason, LlmClient, LlmError, LlmRouter};
use flowforge::scheduler::{Scheduler, SchedulerConfig};
use flowforge::stop::StopToken;

// =============================================================================
// Test LLM client
// =============================================================================

/// Echoes payloads back, records them in order, tracks concurrency, and
/// appends a switchable suffix so re-runs can observe fresh content.
struct TestLlm {
    delay: Duration,
    suffix: std::sync::Mutex<String>,
    payloads: std::sync::Mutex<Vec<String>>,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl TestLlm {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            suffix: std::sync::Mutex::new(String::new()),
            payloads: std::sync::Mutex::new(Vec::new()),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn set_suffix(&self, suffix: &str) {
        *self.suffix.lock().unwrap() = suffix.to_string();
    }

    fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for TestLlm {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, LlmError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.current.fetch_sub(1, Ordering::SeqCst);

        let payload = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.payloads.lock().unwrap().push(payload.clone());

        let suffix = self.suffix.lock().unwrap().clone();
        Ok(Completion::new(format!("{}{}", payload, suffix), FinishReason::Stop))
    }
}

fn executor_for(llm: Arc<TestLlm>) -> Arc<StepExecutor> {
    let router = LlmRouter::with_clients(llm, None, None);
    Arc::new(StepExecutor::new(Arc::new(router)))
}

// =============================================================================
// Builders
// =============================================================================

fn step(out_dir: &std::path::Path, id: &str, order: u32, deps: &[&str], prompt: &str, inputs: Vec<FileInput>) -> Step {
    Step {
        id: id.to_string(),
        order,
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        config: StepConfig {
            file_inputs: inputs,
            prompt_inputs: vec![PromptInput {
                content: prompt.to_string(),
                file_references: vec![],
            }],
            output_folder: out_dir.to_string_lossy().to_string(),
            output_file_name: format!("{}.txt", id),
            api_endpoint: Endpoint::ChatRelay,
        },
        status: Default::default(),
        result: None,
    }
}

fn literal(temp: &TempDir, name: &str, content: &str) -> FileInput {
    let path = temp.path().join(format!("{}.in", name));
    std::fs::write(&path, content).unwrap();
    FileInput {
        name: name.to_string(),
        path: path.to_string_lossy().to_string(),
        depends_on: None,
    }
}

fn forwarded(name: &str, from: &str) -> FileInput {
    FileInput {
        name: name.to_string(),
        path: String::new(),
        depends_on: Some(from.to_string()),
    }
}

fn workflow(id: &str, steps: Vec<Step>) -> Workflow {
    Workflow {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        steps,
    }
}

fn task_of(id: &str, workflows: Vec<Workflow>) -> Task {
    Task {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        template: Template {
            workflows,
            ..Default::default()
        },
        status: TaskStatus::Idle,
        progress: 0.0,
        execution_results: None,
        created_at: None,
        updated_at: None,
    }
}

fn one_step_task(temp: &TempDir, id: &str) -> Task {
    let out = temp.path().join("out").join(id);
    task_of(
        id,
        vec![workflow(
            &format!("{}-w", id),
            vec![step(&out, "s1", 0, &[], "{{src}}", vec![literal(temp, &format!("{}-src", id), "content")])],
        )],
    )
}

// =============================================================================
// Scenario A: linear forwarding
// =============================================================================

#[tokio::test]
async fn test_linear_chain_forwards_content() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let llm = TestLlm::new();
    let runner = WorkflowRunner::new(executor_for(llm.clone()));

    let wf = workflow(
        "linear",
        vec![
            step(&out, "s1", 0, &[], "{{src}}", vec![literal(&temp, "src", "the payload")]),
            step(&out, "s2", 1, &["s1"], "{{in}}", vec![forwarded("in", "s1")]),
            step(&out, "s3", 2, &["s2"], "{{in}}", vec![forwarded("in", "s2")]),
        ],
    );

    let mut state = RunState::default();
    let outcome = runner.run(&wf, &mut state, &StopToken::new()).await.unwrap();

    assert!(outcome.succeeded);
    let final_output = std::fs::read_to_string(out.join("s3.txt")).unwrap();
    assert_eq!(final_output, "the payload");
    assert_eq!(llm.calls(), 3);
}

// =============================================================================
// Scenario B: diamond ordering and fan-in
// =============================================================================

#[tokio::test]
async fn test_diamond_runs_in_order_and_joins_results() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let llm = TestLlm::new();
    let runner = WorkflowRunner::new(executor_for(llm.clone()));

    let wf = workflow(
        "diamond",
        vec![
            step(&out, "s1", 0, &[], "mark-s1 {{src}}", vec![literal(&temp, "src", "root")]),
            step(&out, "s2", 1, &["s1"], "mark-s2 {{in}}", vec![forwarded("in", "s1")]),
            step(&out, "s3", 2, &["s1"], "mark-s3 {{in}}", vec![forwarded("in", "s1")]),
            step(
                &out,
                "s4",
                3,
                &["s2", "s3"],
                "mark-s4 {{left}} {{right}}",
                vec![forwarded("left", "s2"), forwarded("right", "s3")],
            ),
        ],
    );

    let mut state = RunState::default();
    let outcome = runner.run(&wf, &mut state, &StopToken::new()).await.unwrap();
    assert!(outcome.succeeded);

    // Invocation order follows the `order` tie-break
    let markers: Vec<String> = llm
        .payloads()
        .iter()
        .map(|p| p.split_whitespace().next().unwrap().to_string())
        .collect();
    assert_eq!(markers, vec!["mark-s1", "mark-s2", "mark-s3", "mark-s4"]);

    // The join step saw both branches' outputs
    let s4 = std::fs::read_to_string(out.join("s4.txt")).unwrap();
    assert!(s4.contains("mark-s2"));
    assert!(s4.contains("mark-s3"));
}

// =============================================================================
// Scenario D: batch cap
// =============================================================================

#[tokio::test]
async fn test_batch_cap_bounds_concurrency() {
    let temp = TempDir::new().unwrap();
    let llm = TestLlm::with_delay(Duration::from_millis(50));
    let scheduler = Arc::new(Scheduler::new(
        SchedulerConfig {
            max_concurrent_tasks: 2,
            inter_task_delay_ms: 1,
            inter_workflow_delay_ms: 1,
        },
        executor_for(llm.clone()),
    ));

    let tasks: Vec<Task> = (0..5).map(|i| one_step_task(&temp, &format!("t{}", i))).collect();
    let reports = scheduler.execute_all(tasks).await;

    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|(_, r)| r.status == TaskStatus::Completed));
    // One step per task makes LLM concurrency equal task concurrency
    assert_eq!(llm.peak.load(Ordering::SeqCst), 2, "pool should saturate at the cap");
    assert_eq!(scheduler.running_count().await, 0);
}

// =============================================================================
// Scenario E: partial re-run from a middle step
// =============================================================================

#[tokio::test]
async fn test_rerun_from_middle_uses_fresh_value() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let llm = TestLlm::new();
    let runner = WorkflowRunner::new(executor_for(llm.clone()));

    let wf = workflow(
        "chain",
        vec![
            step(&out, "s1", 0, &[], "{{src}}", vec![literal(&temp, "src", "base")]),
            step(&out, "s2", 1, &["s1"], "{{in}}", vec![forwarded("in", "s1")]),
            step(&out, "s3", 2, &["s2"], "{{in}}", vec![forwarded("in", "s2")]),
        ],
    );

    let mut state = RunState::default();
    runner.run(&wf, &mut state, &StopToken::new()).await.unwrap();
    let s1_before = state.result("s1").cloned().unwrap();
    assert_eq!(std::fs::read_to_string(out.join("s3.txt")).unwrap(), "base");

    // The model now produces different output; re-run from s2 only
    llm.set_suffix(" v2");
    let outcome = runner
        .rerun_from(&wf, "s2", &mut state, &StopToken::new())
        .await
        .unwrap();

    assert!(outcome.succeeded);
    assert_eq!(state.result("s1").cloned().unwrap(), s1_before, "s1 untouched");
    // s2 appended " v2" once, s3 echoed it and appended again
    assert_eq!(std::fs::read_to_string(out.join("s3.txt")).unwrap(), "base v2 v2");
    assert_eq!(llm.calls(), 5, "exactly s2 and s3 re-ran");
}

// =============================================================================
// Scenario F: cancellation between workflows
// =============================================================================

#[tokio::test]
async fn test_stop_after_first_workflow() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let llm = TestLlm::with_delay(Duration::from_millis(50));
    let scheduler = Arc::new(Scheduler::new(
        SchedulerConfig {
            max_concurrent_tasks: 2,
            inter_task_delay_ms: 1,
            // Long pause so the stop lands between workflows
            inter_workflow_delay_ms: 500,
        },
        executor_for(llm.clone()),
    ));

    let task = task_of(
        "t-stop",
        vec![
            workflow("w1", vec![step(&out, "s1", 0, &[], "{{a}}", vec![literal(&temp, "a", "1")])]),
            workflow("w2", vec![step(&out, "s2", 0, &[], "{{b}}", vec![literal(&temp, "b", "2")])]),
            workflow("w3", vec![step(&out, "s3", 0, &[], "{{c}}", vec![literal(&temp, "c", "3")])]),
        ],
    );

    let background = {
        let scheduler = Arc::clone(&scheduler);
        let task = task.clone();
        tokio::spawn(async move { scheduler.execute(&task).await })
    };

    // Wait for workflow #1 to finish, then stop during the pause
    loop {
        if let Some(exec) = scheduler.execution("t-stop").await
            && exec.progress > 0.0
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(scheduler.stop("t-stop").await);

    let report = background.await.unwrap().unwrap();
    assert!(report.cancelled);
    assert_eq!(report.status, TaskStatus::Idle);
    assert_eq!(report.results.completed_workflows, 1);
    assert!(report.results.end_time.is_some());

    // Workflows #2 and #3 never ran
    assert_eq!(llm.calls(), 1);
    assert!(out.join("s1.txt").exists());
    assert!(!out.join("s2.txt").exists());
    assert!(!out.join("s3.txt").exists());
}

// =============================================================================
// Failure propagation across a task
// =============================================================================

#[tokio::test]
async fn test_workflow_failure_does_not_abort_task() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let llm = TestLlm::new();
    let scheduler = Arc::new(Scheduler::new(
        SchedulerConfig {
            max_concurrent_tasks: 2,
            inter_task_delay_ms: 1,
            inter_workflow_delay_ms: 1,
        },
        executor_for(llm.clone()),
    ));

    // w1's step reads a file that does not exist, w2 is fine
    let missing = FileInput {
        name: "ghost".to_string(),
        path: temp.path().join("ghost.in").to_string_lossy().to_string(),
        depends_on: None,
    };
    let task = task_of(
        "t-mixed",
        vec![
            workflow("w1", vec![step(&out, "s1", 0, &[], "{{ghost}}", vec![missing])]),
            workflow("w2", vec![step(&out, "s2", 0, &[], "{{ok}}", vec![literal(&temp, "ok", "fine")])]),
        ],
    );

    let report = scheduler.execute(&task).await.unwrap();

    assert_eq!(report.status, TaskStatus::Completed);
    assert_eq!(report.results.completed_workflows, 1);
    assert_eq!(report.results.failed_workflows, 1);
    assert!(out.join("s2.txt").exists());
}

// =============================================================================
// Persistence purity through the config store
// =============================================================================

#[tokio::test]
async fn test_saved_documents_reload_cold() {
    use configstore::{ConfigKind, ConfigStore};

    let temp = TempDir::new().unwrap();
    let store = ConfigStore::open(temp.path().join("configs")).unwrap();

    let mut task = one_step_task(&temp, "t-persist");
    task.status = TaskStatus::Running;
    task.template.workflows[0].steps[0].status = flowforge::StepStatus::Success;
    task.template.workflows[0].steps[0].result = Some(flowforge::StepResult::failure("stale"));

    let document = flowforge::StreamDocument {
        workflow_groups: vec![task],
        ..Default::default()
    };

    store
        .save(ConfigKind::MultiStream, serde_json::to_value(&document).unwrap())
        .unwrap();
    let reloaded = flowforge::StreamDocument::from_value(&store.load(ConfigKind::MultiStream).unwrap()).unwrap();

    let task = &reloaded.workflow_groups[0];
    assert_eq!(task.status, TaskStatus::Idle);
    let step = &task.template.workflows[0].steps[0];
    assert_eq!(step.status, flowforge::StepStatus::Pending);
    assert!(step.result.is_none());
}
