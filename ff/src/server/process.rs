//! Ad-hoc processing routes
//!
//! `process-file` runs one step-executor pass built from the request
//! body; the direct variant selects a streaming model via the query
//! string. `generate-react` passes straight through to the chat relay,
//! and `list-files` exposes the content store's recursive listing.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::domain::{Endpoint, FileInput, ModelKind, PromptInput, Step, StepConfig};
use crate::error::EngineError;
use crate::stop::StopToken;

use super::AppState;
use super::envelope::ApiResponse;

/// One entry of the ad-hoc input sequence
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProcessInput {
    /// A file path whose contents join the payload
    File { value: String },
    /// Literal prompt text
    Prompt { value: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessFileRequest {
    pub inputs: Vec<ProcessInput>,
    pub output_file_name: String,
    pub output_folder: String,
}

#[derive(Debug, Deserialize)]
pub struct DirectQuery {
    pub model: Option<String>,
}

/// Build a one-off step from the request's input sequence.
///
/// File entries become named file inputs referenced by `{{fileN}}`
/// tokens, so the executor reproduces the request's interleaving.
fn adhoc_step(request: &ProcessFileRequest, endpoint: Endpoint) -> Step {
    let mut file_inputs = Vec::new();
    let mut content = Vec::new();

    for (i, input) in request.inputs.iter().enumerate() {
        match input {
            ProcessInput::Prompt { value } => content.push(value.clone()),
            ProcessInput::File { value } => {
                let name = format!("file{}", i + 1);
                content.push(format!("{{{{{}}}}}", name));
                file_inputs.push(FileInput {
                    name,
                    path: value.clone(),
                    depends_on: None,
                });
            }
        }
    }

    Step {
        id: "adhoc".to_string(),
        order: 0,
        dependencies: vec![],
        config: StepConfig {
            file_inputs,
            prompt_inputs: vec![PromptInput {
                content: content.join("\n"),
                file_references: vec![],
            }],
            output_folder: request.output_folder.clone(),
            output_file_name: request.output_file_name.clone(),
            api_endpoint: endpoint,
        },
        status: Default::default(),
        result: None,
    }
}

async fn run_adhoc(state: &AppState, request: ProcessFileRequest, endpoint: Endpoint) -> Json<ApiResponse> {
    let step = adhoc_step(&request, endpoint);
    let result = state
        .executor
        .execute(&step, &HashMap::new(), &StopToken::new())
        .await;

    if result.success {
        Json(ApiResponse {
            message: Some(result.message),
            ..ApiResponse::ok(result.data)
        })
    } else {
        Json(ApiResponse::error(result.message))
    }
}

/// `POST /api/process-file` via the chat relay
pub async fn process_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessFileRequest>,
) -> Json<ApiResponse> {
    debug!(inputs = request.inputs.len(), output = %request.output_file_name, "process-file");
    run_adhoc(&state, request, Endpoint::ChatRelay).await
}

/// `POST /api/process-file-direct?model=qianwen|deepseek`
pub async fn process_file_direct(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DirectQuery>,
    Json(request): Json<ProcessFileRequest>,
) -> Json<ApiResponse> {
    let model = match query.model.as_deref() {
        Some("deepseek") => ModelKind::Deepseek,
        _ => ModelKind::Qianwen,
    };
    debug!(?model, inputs = request.inputs.len(), "process-file-direct");
    run_adhoc(&state, request, Endpoint::DirectStream(model)).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReactRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub system_prompt: Option<String>,
}

/// `POST /api/generate-react`: thin pass-through to the chat relay
pub async fn generate_react(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateReactRequest>,
) -> Json<ApiResponse> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());

    match state
        .relay
        .react(&request.message, &session_id, request.system_prompt.as_deref())
        .await
    {
        Ok(reply) => Json(ApiResponse::ok(json!({ "reply": reply, "sessionId": session_id }))),
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesRequest {
    pub folder_path: String,
    pub file_type: String,
}

/// `POST /api/list-files`: relative paths under a folder by extension
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ListFilesRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.content.list_files(&request.folder_path, &request.file_type) {
        Ok(files) => (StatusCode::OK, Json(ApiResponse::ok(files))),
        Err(EngineError::NotFound(message)) => (StatusCode::NOT_FOUND, Json(ApiResponse::error(message))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}
