use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{CommitInfo, VersionToken, VersionedDocument};
use crate::objects::blob_sha;
use crate::repo::{ContentStore, StoreError};

/// In-memory ContentStore for tests and throwaway deployments.
///
/// Tokens are git blob ids of the stored bytes. The check and the swap happen
/// under one lock, so of several writers holding the same token exactly one
/// gets through.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, Vec<u8>>,
    history: Vec<CommitInfo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a document without recording a commit.
    pub fn insert(&self, path: &str, content: Vec<u8>) {
        self.lock().documents.insert(path.to_string(), content);
    }

    /// Raw bytes of a document, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().documents.get(path).cloned()
    }

    /// Every accepted commit/create, oldest first.
    pub fn history(&self) -> Vec<CommitInfo> {
        self.lock().history.clone()
    }
}

impl ContentStore for MemoryStore {
    async fn fetch(&self, path: &str) -> Result<VersionedDocument, StoreError> {
        let inner = self.lock();
        let content = inner
            .documents
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })?;
        let version = blob_sha(&content).into();
        Ok(VersionedDocument { content, version })
    }

    async fn commit(
        &self,
        path: &str,
        content: Vec<u8>,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let mut inner = self.lock();
        let current = inner
            .documents
            .get(path)
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })?;
        if VersionToken::from(blob_sha(current)) != *expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        let version: VersionToken = blob_sha(&content).into();
        inner.documents.insert(path.to_string(), content);
        inner.history.push(CommitInfo {
            path: path.to_string(),
            message: message.to_string(),
            version: version.clone(),
        });
        Ok(version)
    }

    async fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let mut inner = self.lock();
        if inner.documents.contains_key(path) {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }

        let version: VersionToken = blob_sha(&content).into();
        inner.documents.insert(path.to_string(), content);
        inner.history.push(CommitInfo {
            path: path.to_string(),
            message: message.to_string(),
            version: version.clone(),
        });
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.fetch("a.docx").await.unwrap_err(),
            StoreError::NotFound {
                path: "a.docx".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_stale_token_is_rejected_and_first_writer_wins() {
        let store = MemoryStore::new();
        store.insert("a.txt", b"T0".to_vec());

        // Both writers read the same version.
        let a = store.fetch("a.txt").await.unwrap();
        let b = store.fetch("a.txt").await.unwrap();
        assert_eq!(a.version, b.version);

        let t1 = store
            .commit("a.txt", b"T0+A".to_vec(), &a.version, "writer a")
            .await
            .unwrap();
        let err = store
            .commit("a.txt", b"T0+B".to_vec(), &b.version, "writer b")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::Conflict {
                path: "a.txt".to_string()
            }
        );
        let now = store.fetch("a.txt").await.unwrap();
        assert_eq!(now.content, b"T0+A");
        assert_eq!(now.version, t1);
        assert_eq!(store.history().len(), 1);
    }

    #[tokio::test]
    async fn test_create_refuses_existing_path() {
        let store = MemoryStore::new();
        store.create("u.json", b"[]".to_vec(), "init").await.unwrap();
        let err = store
            .create("u.json", b"[]".to_vec(), "again")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_commit_on_missing_path_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .commit("x", b"1".to_vec(), &VersionToken::new("t"), "m")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
