//! FlowForge CLI entry point

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::info;

use configstore::ConfigKind;
use flowforge::cli::{Cli, Command};
use flowforge::config::Config;
use flowforge::domain::StreamDocument;
use flowforge::server::AppState;

fn setup_logging(verbose: bool) {
    let default_level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Serve { port }) => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!(port = config.server.port, "starting control API");
            let state = AppState::from_config(config)?;
            flowforge::server::serve(state).await
        }
        Some(Command::Run { task_id }) => run_task(config, &task_id).await,
        Some(Command::RunAll) => run_all(config).await,
        None => {
            println!("FlowForge v{}", env!("CARGO_PKG_VERSION"));
            println!("  Control API port: {}", config.server.port);
            println!("  Max concurrent tasks: {}", config.scheduler.max_concurrent_tasks);
            println!("  Config documents: {}", config.storage.config_dir.display());
            Ok(())
        }
    }
}

async fn run_task(config: Config, task_id: &str) -> Result<()> {
    let state = AppState::from_config(config)?;

    let value = state
        .store
        .load(ConfigKind::MultiStream)
        .context("no multi-stream configuration saved")?;
    let mut document = StreamDocument::from_value(&value).context("malformed stream document")?;

    let task = document
        .task(task_id)
        .cloned()
        .ok_or_else(|| eyre!("task not found: {}", task_id))?;

    info!(task = %task.id, name = %task.name, "executing task");
    let report = state.scheduler.execute(&task).await?;

    let mut updated = task;
    report.apply_to(&mut updated);
    document.replace_task(updated);
    state
        .store
        .save(ConfigKind::MultiStream, document.to_value()?)
        .context("failed to persist task outcome")?;

    println!("Task {} finished: {}", task_id, report.status);
    println!(
        "  workflows: {} completed, {} failed of {}",
        report.results.completed_workflows, report.results.failed_workflows, report.results.total_workflows
    );
    println!("  duration: {} ms", report.results.duration);

    Ok(())
}

async fn run_all(config: Config) -> Result<()> {
    let state = AppState::from_config(config)?;

    let value = state
        .store
        .load(ConfigKind::MultiStream)
        .context("no multi-stream configuration saved")?;
    let mut document = StreamDocument::from_value(&value).context("malformed stream document")?;

    let batch = document.workflow_groups.clone();
    info!(tasks = batch.len(), "executing batch");
    let reports = state.scheduler.execute_all(batch).await;

    for (task_id, report) in &reports {
        if let Some(task) = document.task(task_id) {
            let mut updated = task.clone();
            report.apply_to(&mut updated);
            document.replace_task(updated);
        }
        println!(
            "Task {} finished: {} ({} completed, {} failed)",
            task_id, report.status, report.results.completed_workflows, report.results.failed_workflows
        );
    }

    state
        .store
        .save(ConfigKind::MultiStream, document.to_value()?)
        .context("failed to persist batch outcome")?;

    println!("Batch done: {} tasks executed", reports.len());
    Ok(())
}
