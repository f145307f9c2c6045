//! HTTP control API
//!
//! The request/response surface over the engine: ad-hoc processing,
//! file listing, configuration documents, and the server-side stream
//! group runner. All algorithmic work lives below this layer.

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use configstore::ConfigStore;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::content::ContentStore;
use crate::engine::StepExecutor;
use crate::llm::{LlmRouter, RelayClient};
use crate::scheduler::Scheduler;

mod config_api;
mod envelope;
mod process;
mod stream_api;

pub use envelope::ApiResponse;

/// Shared state behind every route
pub struct AppState {
    pub config: Config,
    pub content: ContentStore,
    pub relay: Arc<RelayClient>,
    pub executor: Arc<StepExecutor>,
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<ConfigStore>,
}

impl AppState {
    /// Wire the full component stack from resolved configuration
    pub fn from_config(config: Config) -> Result<Arc<Self>> {
        let timeout = std::time::Duration::from_millis(config.llm.timeout_ms);
        let relay =
            Arc::new(RelayClient::from_config(&config.llm.relay, timeout).context("failed to build relay client")?);
        let llm = Arc::new(LlmRouter::from_config(&config.llm).context("failed to build LLM router")?);
        let executor = Arc::new(StepExecutor::new(llm));
        let scheduler = Arc::new(Scheduler::new(config.scheduler.clone(), Arc::clone(&executor)));
        let store =
            Arc::new(ConfigStore::open(&config.storage.config_dir).context("failed to open config store")?);

        Ok(Arc::new(Self {
            config,
            content: ContentStore::new(),
            relay,
            executor,
            scheduler,
            store,
        }))
    }
}

/// Build the control API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/process-file", post(process::process_file))
        .route("/api/process-file-direct", post(process::process_file_direct))
        .route("/api/generate-react", post(process::generate_react))
        .route("/api/list-files", post(process::list_files))
        .route("/api/config/save", post(config_api::save))
        .route("/api/config/load", get(config_api::load))
        .route("/api/config/delete", delete(config_api::delete_config))
        .route("/api/config/info", get(config_api::info))
        .route("/api/multi-stream/save", post(stream_api::save))
        .route("/api/multi-stream/load", get(stream_api::load))
        .route("/api/multi-stream/materialize", post(stream_api::materialize_tasks))
        .route("/api/multi-stream/process", post(stream_api::process))
        .route("/api/multi-stream/process-all", post(stream_api::process_all))
        .route("/api/multi-stream/stop", post(stream_api::stop))
        .route("/api/multi-stream/stop-all", post(stream_api::stop_all))
        .route("/api/multi-stream/status", post(stream_api::status))
        .route("/api/multi-stream/info", get(stream_api::info))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is terminated
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let port = state.config.server.port;
    let app = router(state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .context(format!("failed to bind port {}", port))?;
    info!(port, "control API listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
