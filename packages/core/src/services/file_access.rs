//! Document file access
//!
//! Reads and writes document files for the tool layer and the sync
//! coordinator's save path. I/O failures are classified into the error
//! taxonomy here so raw `io::Error`s never leave this module.

use crate::codec::Dialect;
use crate::services::MindmapError;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-access collaborator for mindmap documents
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentFiles;

impl DocumentFiles {
    pub fn new() -> Self {
        Self
    }

    /// Dialect implied by the file extension
    pub fn dialect_for(&self, path: &Path) -> Result<Dialect, MindmapError> {
        Dialect::from_path(path).ok_or_else(|| {
            MindmapError::file(
                path.display().to_string(),
                "unsupported file extension (expected .json, .yaml, .yml or .mindmap)",
            )
        })
    }

    pub async fn read(&self, path: &Path) -> Result<String, MindmapError> {
        fs::read_to_string(path)
            .await
            .map_err(|e| MindmapError::from_io(path, &e))
    }

    /// Write via a sibling temp file and rename, so readers never observe a
    /// half-written document
    pub async fn write_atomic(&self, path: &Path, contents: &str) -> Result<(), MindmapError> {
        let temp_file = temp_path(path);

        fs::write(&temp_file, contents)
            .await
            .map_err(|e| MindmapError::from_io(path, &e))?;

        if let Err(e) = fs::rename(&temp_file, path).await {
            let _ = fs::remove_file(&temp_file).await;
            return Err(MindmapError::from_io(path, &e));
        }

        tracing::debug!("Wrote {} bytes to {}", contents.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.yaml");
        let files = DocumentFiles::new();

        files.write_atomic(&path, "root: {}\n").await.unwrap();
        assert_eq!(files.read(&path).await.unwrap(), "root: {}\n");
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_classified() {
        let temp_dir = TempDir::new().unwrap();
        let err = DocumentFiles::new()
            .read(&temp_dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("no-such-dir").join("map.json");
        let err = DocumentFiles::new()
            .write_atomic(&path, "{}")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "FILE_NOT_FOUND");
    }

    #[test]
    fn test_read_outside_async_context() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("map.json");
        std::fs::write(&path, "{\"root\":{}}").unwrap();

        let text = tokio_test::block_on(DocumentFiles::new().read(&path)).unwrap();
        assert_eq!(text, "{\"root\":{}}");
    }

    #[test]
    fn test_dialect_for_extension() {
        let files = DocumentFiles::new();
        assert_eq!(files.dialect_for(Path::new("a.json")).unwrap(), Dialect::Strict);
        assert_eq!(files.dialect_for(Path::new("a.mindmap")).unwrap(), Dialect::Authorable);
        assert_eq!(
            files.dialect_for(Path::new("a.txt")).unwrap_err().code(),
            "FILE_ERROR"
        );
    }
}
