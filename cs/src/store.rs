//! Core ConfigStore implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::strip::strip_runtime_state;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The two logical documents the store manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// Standalone workflows (`app-config.json`)
    App,
    /// Tasks and templates (`multi-file-stream-config.json`)
    MultiStream,
}

impl ConfigKind {
    /// Fixed on-disk file name for this document
    pub fn file_name(self) -> &'static str {
        match self {
            Self::App => "app-config.json",
            Self::MultiStream => "multi-file-stream-config.json",
        }
    }

    fn lock_index(self) -> usize {
        match self {
            Self::App => 0,
            Self::MultiStream => 1,
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Metadata about a stored document
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Absolute or configured path of the document
    pub config_path: String,
    /// Whether the file exists on disk
    pub exists: bool,
    /// File size in bytes (0 when absent)
    pub size: u64,
    /// Last modification time, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Single-document JSON store
///
/// Writes go through a per-document mutex and land via temp-file +
/// rename, so concurrent savers serialize and readers never observe a
/// half-written file. Loads take no lock.
pub struct ConfigStore {
    base_dir: PathBuf,
    locks: [Mutex<()>; 2],
}

impl ConfigStore {
    /// Open or create a store rooted at the given directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        debug!(dir = %base_dir.display(), "Opened config store");
        Ok(Self {
            base_dir,
            locks: [Mutex::new(()), Mutex::new(())],
        })
    }

    /// Path of a document on disk
    pub fn path_for(&self, kind: ConfigKind) -> PathBuf {
        self.base_dir.join(kind.file_name())
    }

    /// Load a document, failing with `NotFound` when it does not exist
    pub fn load(&self, kind: ConfigKind) -> Result<Value, StoreError> {
        let path = self.path_for(kind);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(kind.file_name().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist a document
    ///
    /// Strips transient runtime state, stamps `lastUpdated` and
    /// `version`, then writes atomically. Returns the document as
    /// written.
    pub fn save(&self, kind: ConfigKind, mut doc: Value) -> Result<Value, StoreError> {
        strip_runtime_state(&mut doc);

        if let Some(obj) = doc.as_object_mut() {
            obj.insert("lastUpdated".to_string(), Value::String(Utc::now().to_rfc3339()));
            obj.insert(
                "version".to_string(),
                Value::String(env!("CARGO_PKG_VERSION").to_string()),
            );
        }

        let path = self.path_for(kind);
        let tmp = self.base_dir.join(format!("{}.tmp", kind.file_name()));
        let bytes = serde_json::to_vec_pretty(&doc)?;

        let _guard = self.locks[kind.lock_index()].lock().unwrap_or_else(|e| e.into_inner());
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &path)?;

        info!(document = %kind, bytes = bytes.len(), "Saved config document");
        Ok(doc)
    }

    /// Metadata for a document (never fails on absence)
    pub fn info(&self, kind: ConfigKind) -> Result<DocumentInfo, StoreError> {
        let path = self.path_for(kind);
        match fs::metadata(&path) {
            Ok(meta) => Ok(DocumentInfo {
                config_path: path.display().to_string(),
                exists: true,
                size: meta.len(),
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DocumentInfo {
                config_path: path.display().to_string(),
                exists: false,
                size: 0,
                last_modified: None,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a document; returns whether a file was removed
    pub fn delete(&self, kind: ConfigKind) -> Result<bool, StoreError> {
        let path = self.path_for(kind);
        let _guard = self.locks[kind.lock_index()].lock().unwrap_or_else(|e| e.into_inner());
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(document = %kind, "Deleted config document");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
