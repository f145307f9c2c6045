//! ConfigStore - single-document JSON persistence for FlowForge
//!
//! Holds the two configuration documents the orchestrator works against:
//! the standalone-workflow document and the multi-file-stream document
//! (tasks and templates). Documents are opaque JSON values; writes are
//! atomic (temp file + rename) and serialized per document, loads are
//! plain snapshot reads. Before every save the store strips transient
//! runtime state so a reloaded document always comes back cold.

mod store;
mod strip;

pub use store::{ConfigKind, ConfigStore, DocumentInfo, StoreError};
pub use strip::strip_runtime_state;
