//! Team document persisted as a JSON file

use super::{StoreError, WorkspaceDocument, WorkspaceStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Team document stored in a JSON file.
///
/// A save writes a sibling temp file and renames it over the target, so
/// readers see either the old or the new document, never a mix.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write(&self, doc: &WorkspaceDocument) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = ?self.path, "Team document written");
        Ok(())
    }
}

#[async_trait]
impl WorkspaceStore for FileStore {
    async fn get(&self) -> Result<WorkspaceDocument, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WorkspaceDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, doc: WorkspaceDocument) -> Result<(), StoreError> {
        self.write(&doc).await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.write(&WorkspaceDocument::default()).await
    }
}
