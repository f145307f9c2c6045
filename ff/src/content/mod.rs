//! Content Store: the engine's view of the filesystem
//!
//! Reads input files, prepares output directories, writes results
//! atomically, and lists candidate source files for materialization.
//! No caching layer; every read hits the filesystem, and input files
//! are never mutated.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::EngineError;

/// Filesystem access for the step executor and the control API
#[derive(Debug, Clone, Default)]
pub struct ContentStore;

impl ContentStore {
    pub fn new() -> Self {
        Self
    }

    /// Read a UTF-8 text file; `InputMissing` when it does not exist
    pub async fn read_file(&self, path: impl AsRef<Path>) -> Result<String, EngineError> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::InputMissing(path.to_path_buf()))
            }
            Err(e) => Err(EngineError::io(path, e)),
        }
    }

    /// Create a directory and all missing ancestors; idempotent
    pub async fn ensure_dir(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let path = path.as_ref();
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| EngineError::io(path, e))
    }

    /// Write a file atomically: temp file in the target directory, then
    /// rename over the destination
    pub async fn write_file(&self, path: impl AsRef<Path>, contents: &str) -> Result<(), EngineError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EngineError::ConfigInvalid(format!("invalid output path: {}", path.display())))?;
        let tmp = path.with_file_name(format!(".{}.tmp", file_name));

        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| EngineError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| EngineError::io(path, e))?;

        debug!(path = %path.display(), bytes = contents.len(), "wrote output file");
        Ok(())
    }

    /// Recursively list files under `root` whose extension matches,
    /// as paths relative to `root`. The extension matches with or
    /// without a leading dot; result order is not specified.
    pub fn list_files(&self, root: impl AsRef<Path>, extension: &str) -> Result<Vec<String>, EngineError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(EngineError::NotFound(format!(
                "folder does not exist: {}",
                root.display()
            )));
        }

        let wanted = extension.trim_start_matches('.');
        let mut files = Vec::new();

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == wanted);
            if !matches {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(root) {
                files.push(relative.to_string_lossy().to_string());
            }
        }

        debug!(root = %root.display(), extension = wanted, count = files.len(), "listed files");
        Ok(files)
    }
}
