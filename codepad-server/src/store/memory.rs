//! In-process team document

use super::{StoreError, WorkspaceDocument, WorkspaceStore};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Team document held in memory; lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: RwLock<WorkspaceDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceStore for MemoryStore {
    async fn get(&self) -> Result<WorkspaceDocument, StoreError> {
        Ok(self.doc.read().await.clone())
    }

    async fn set(&self, doc: WorkspaceDocument) -> Result<(), StoreError> {
        *self.doc.write().await = doc;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        *self.doc.write().await = WorkspaceDocument::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    #[tokio::test]
    async fn test_first_access_is_default() {
        let store = MemoryStore::new();
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let store = MemoryStore::new();
        let doc = WorkspaceDocument::edited("int main() {}", Language::C, Some("a".into()));
        store.set(doc.clone()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), doc);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryStore::new();
        store
            .set(WorkspaceDocument::edited("first", Language::Python, Some("a".into())))
            .await
            .unwrap();
        store
            .set(WorkspaceDocument::edited("second", Language::Java, Some("b".into())))
            .await
            .unwrap();

        let doc = store.get().await.unwrap();
        assert_eq!(doc.content, "second");
        assert_eq!(doc.last_editor.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_reset() {
        let store = MemoryStore::new();
        store
            .set(WorkspaceDocument::edited("x", Language::C, None))
            .await
            .unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.get().await.unwrap(), WorkspaceDocument::default());
    }
}
