//! Team document reached over a codepad server's `/team-workspace` route

use super::{StoreError, TeamSave, WorkspaceDocument, WorkspaceStore};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;

/// Client-side view of a server's team document
pub struct RemoteStore {
    client: Client,
    url: String,
}

impl RemoteStore {
    /// `base_url` is the server root, e.g. `http://localhost:8080`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = base_url.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{}/team-workspace", base_url.trim_end_matches('/')),
        })
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status { status, body })
    }
}

#[async_trait]
impl WorkspaceStore for RemoteStore {
    async fn get(&self) -> Result<WorkspaceDocument, StoreError> {
        let response = ensure_success(self.client.get(&self.url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn set(&self, doc: WorkspaceDocument) -> Result<(), StoreError> {
        let body = TeamSave {
            content: doc.content,
            language: doc.language,
            modified_by: doc.last_editor,
        };
        ensure_success(self.client.post(&self.url).json(&body).send().await?).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        ensure_success(self.client.delete(&self.url).send().await?).await?;
        Ok(())
    }
}
