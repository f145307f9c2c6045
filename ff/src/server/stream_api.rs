//! Multi-file-stream routes (`/api/multi-stream/*`)
//!
//! Document save/load/info plus the server-side runner: `process`
//! executes one stream group (task) end to end and persists its final
//! status back into the document.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use configstore::{ConfigKind, StoreError};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::domain::StreamDocument;
use crate::error::EngineError;
use crate::materialize::{MaterializeOptions, Selection, materialize};

use super::AppState;
use super::envelope::ApiResponse;

/// `POST /api/multi-stream/save`
pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.store.save(ConfigKind::MultiStream, document) {
        Ok(saved) => (
            StatusCode::OK,
            Json(ApiResponse {
                message: Some("stream configuration saved".to_string()),
                ..ApiResponse::ok(saved)
            }),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}

/// `GET /api/multi-stream/load`: 404 when absent
pub async fn load(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    match state.store.load(ConfigKind::MultiStream) {
        Ok(document) => (StatusCode::OK, Json(ApiResponse::ok(document))),
        Err(StoreError::NotFound(name)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("no saved configuration: {}", name))),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}

/// `GET /api/multi-stream/info`: store metadata plus the group count
pub async fn info(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    let info = match state.store.info(ConfigKind::MultiStream) {
        Ok(info) => info,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };

    let group_count = state
        .store
        .load(ConfigKind::MultiStream)
        .ok()
        .and_then(|value| StreamDocument::from_value(&value).ok())
        .map(|doc| doc.workflow_groups.len())
        .unwrap_or(0);

    let mut data = serde_json::to_value(&info).unwrap_or_else(|_| json!({}));
    data["streamGroupsCount"] = json!(group_count);
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeRequest {
    pub template_id: String,
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub options: MaterializeOptions,
}

/// `POST /api/multi-stream/materialize`: expand a stored template over
/// the selected files and append the produced tasks to the document
pub async fn materialize_tasks(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MaterializeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let value = match state.store.load(ConfigKind::MultiStream) {
        Ok(value) => value,
        Err(StoreError::NotFound(name)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("no saved configuration: {}", name))),
            );
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };

    let mut document = match StreamDocument::from_value(&value) {
        Ok(document) => document,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("malformed stream document: {}", e))),
            );
        }
    };

    let Some(template) = document
        .workflow_group_templates
        .iter()
        .find(|t| t.id == request.template_id)
        .cloned()
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("template not found: {}", request.template_id))),
        );
    };

    let tasks = materialize(&template, &request.selections, &request.options);
    let created: Vec<Value> = tasks
        .iter()
        .map(|t| json!({ "id": t.id, "name": t.name }))
        .collect();
    info!(template = %template.id, created = tasks.len(), "materialized tasks");
    document.workflow_groups.extend(tasks);

    let value = match document.to_value() {
        Ok(value) => value,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };
    if let Err(e) = state.store.save(ConfigKind::MultiStream, value) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string())));
    }

    (
        StatusCode::OK,
        Json(ApiResponse::ok(json!({ "count": created.len(), "tasks": created }))),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub stream_group_id: String,
}

/// `POST /api/multi-stream/process`: run one stream group server-side
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let value = match state.store.load(ConfigKind::MultiStream) {
        Ok(value) => value,
        Err(StoreError::NotFound(name)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("no saved configuration: {}", name))),
            );
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };

    let mut document = match StreamDocument::from_value(&value) {
        Ok(document) => document,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("malformed stream document: {}", e))),
            );
        }
    };

    let Some(task) = document.task(&request.stream_group_id).cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "stream group not found: {}",
                request.stream_group_id
            ))),
        );
    };

    info!(task = %task.id, "processing stream group");
    let report = match state.scheduler.execute(&task).await {
        Ok(report) => report,
        Err(EngineError::ConcurrencyLimit { limit }) => {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::error(format!(
                    "concurrency limit reached: {} tasks already running",
                    limit
                ))),
            );
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };

    // Fold the outcome back into the persisted document
    let mut updated = task;
    report.apply_to(&mut updated);
    document.replace_task(updated);
    match document.to_value().map(|v| state.store.save(ConfigKind::MultiStream, v)) {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to persist task outcome"),
        Err(e) => warn!(error = %e, "failed to serialize task outcome"),
    }

    let data = json!({
        "taskId": request.stream_group_id,
        "status": report.status.to_string(),
        "completedWorkflows": report.results.completed_workflows,
        "failedWorkflows": report.results.failed_workflows,
        "duration": report.results.duration,
    });
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

/// `POST /api/multi-stream/process-all`: batch-execute every idle
/// executable task under the concurrency cap
pub async fn process_all(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    let value = match state.store.load(ConfigKind::MultiStream) {
        Ok(value) => value,
        Err(StoreError::NotFound(name)) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("no saved configuration: {}", name))),
            );
        }
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    };

    let mut document = match StreamDocument::from_value(&value) {
        Ok(document) => document,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("malformed stream document: {}", e))),
            );
        }
    };

    let batch = document.workflow_groups.clone();
    info!(tasks = batch.len(), "batch processing requested");
    let reports = state.scheduler.execute_all(batch).await;

    let mut summaries = Vec::with_capacity(reports.len());
    for (task_id, report) in &reports {
        if let Some(task) = document.task(task_id) {
            let mut updated = task.clone();
            report.apply_to(&mut updated);
            document.replace_task(updated);
        }
        summaries.push(json!({
            "taskId": task_id,
            "status": report.status.to_string(),
            "completedWorkflows": report.results.completed_workflows,
            "failedWorkflows": report.results.failed_workflows,
        }));
    }

    match document.to_value().map(|v| state.store.save(ConfigKind::MultiStream, v)) {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to persist batch outcome"),
        Err(e) => warn!(error = %e, "failed to serialize batch outcome"),
    }

    (
        StatusCode::OK,
        Json(ApiResponse::ok(json!({ "executed": summaries.len(), "tasks": summaries }))),
    )
}

/// `POST /api/multi-stream/stop`: signal one running task to stop
pub async fn stop(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if state.scheduler.stop(&request.stream_group_id).await {
        (StatusCode::OK, Json(ApiResponse::ok_message("stop requested")))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "task is not running: {}",
                request.stream_group_id
            ))),
        )
    }
}

/// `POST /api/multi-stream/stop-all`: stop every running task and wait
/// until all have acknowledged
pub async fn stop_all(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    state.scheduler.stop_all().await;
    Json(ApiResponse::ok_message("all tasks stopped"))
}

/// `POST /api/multi-stream/status`: live execution snapshot of a task
pub async fn status(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> Json<ApiResponse> {
    match state.scheduler.execution(&request.stream_group_id).await {
        Some(execution) => Json(ApiResponse::ok(execution)),
        None => Json(ApiResponse::ok(
            json!({ "taskId": request.stream_group_id, "isRunning": false }),
        )),
    }
}
