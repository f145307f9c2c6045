//! Standalone-workflow configuration routes (`/api/config/*`)

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use configstore::{ConfigKind, StoreError};
use serde_json::Value;

use super::AppState;
use super::envelope::ApiResponse;

/// `POST /api/config/save`: overwrite the document as given
pub async fn save(
    State(state): State<Arc<AppState>>,
    Json(document): Json<Value>,
) -> (StatusCode, Json<ApiResponse>) {
    match state.store.save(ConfigKind::App, document) {
        Ok(saved) => (
            StatusCode::OK,
            Json(ApiResponse {
                message: Some("configuration saved".to_string()),
                ..ApiResponse::ok(saved)
            }),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}

/// `GET /api/config/load`: 404 when the document does not exist
pub async fn load(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    match state.store.load(ConfigKind::App) {
        Ok(document) => (StatusCode::OK, Json(ApiResponse::ok(document))),
        Err(StoreError::NotFound(name)) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("no saved configuration: {}", name))),
        ),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}

/// `DELETE /api/config/delete`
pub async fn delete_config(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    match state.store.delete(ConfigKind::App) {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::ok_message("configuration deleted"))),
        Ok(false) => (StatusCode::OK, Json(ApiResponse::ok_message("no configuration to delete"))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}

/// `GET /api/config/info`
pub async fn info(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ApiResponse>) {
    match state.store.info(ConfigKind::App) {
        Ok(info) => (StatusCode::OK, Json(ApiResponse::ok(info))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::error(e.to_string()))),
    }
}
