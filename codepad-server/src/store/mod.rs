//! Persistent store for the shared team document
//!
//! There is exactly one team document. Every save replaces it whole and the
//! last write wins; there is no versioning and no merge.

mod file;
mod memory;
mod remote;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use remote::RemoteStore;

use crate::language::Language;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Content of a team document that nobody has saved yet
pub const DEFAULT_TEAM_CONTENT: &str = "// Welcome to Collaborative Coding!\n";

/// Errors from reading or writing the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// The shared workspace document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub content: String,
    /// Informational only: switching language never loads another document
    pub language: Language,
    #[serde(rename = "modifiedBy")]
    pub last_editor: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "modifiedAt")]
    pub last_edited_at: Option<u64>,
}

impl Default for WorkspaceDocument {
    fn default() -> Self {
        Self {
            content: DEFAULT_TEAM_CONTENT.to_string(),
            language: Language::JavaScript,
            last_editor: None,
            last_edited_at: None,
        }
    }
}

impl WorkspaceDocument {
    /// A document as saved right now by `editor`
    pub fn edited(
        content: impl Into<String>,
        language: Language,
        editor: Option<String>,
    ) -> Self {
        Self {
            content: content.into(),
            language,
            last_editor: editor,
            last_edited_at: Some(now_millis()),
        }
    }
}

/// Body of a team document save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSave {
    pub content: String,
    pub language: Language,
    #[serde(default)]
    pub modified_by: Option<String>,
}

impl From<TeamSave> for WorkspaceDocument {
    fn from(save: TeamSave) -> Self {
        WorkspaceDocument::edited(save.content, save.language, save.modified_by)
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Storage for the single team document
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Current document, or the default if nothing was ever saved
    async fn get(&self) -> Result<WorkspaceDocument, StoreError>;

    /// Replace the document entirely
    async fn set(&self, doc: WorkspaceDocument) -> Result<(), StoreError>;

    /// Put the default document back
    async fn reset(&self) -> Result<(), StoreError>;
}
