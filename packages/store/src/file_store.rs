//! # Filesystem-backed content store
//!
//! [`FileStore`] keeps every document as a plain file under a base directory,
//! which is enough for a single-machine deployment that does not want a remote
//! git host. The version token of a file is the git blob id of its bytes, so a
//! token goes stale exactly when the file content changes.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! ├── EMEF PA-RESSACA.docx       # documents, addressed by relative path
//! ├── usuarios.json
//! └── .history.jsonl             # one CommitInfo per accepted write
//! ```
//!
//! Writes go to a sibling temp file and are renamed into place. Check-and-swap
//! is serialised by a lock shared between clones of the same `FileStore`; two
//! processes pointed at one directory are not coordinated.

use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{CommitInfo, VersionToken, VersionedDocument};
use crate::objects::blob_sha;
use crate::repo::{ContentStore, StoreError};

const HISTORY_FILE: &str = ".history.jsonl";

/// Filesystem-backed ContentStore.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self {
            base,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a document path below the base directory. Absolute paths and
    /// `..` components are refused.
    fn document_path(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StoreError::Backend(format!(
                "invalid document path: {path:?}"
            )));
        }
        Ok(self.base.join(relative))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let file = self.document_path(path)?;
        std::fs::read(&file).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: path.to_string(),
            },
            _ => StoreError::Backend(format!("read {}: {e}", file.display())),
        })
    }

    fn write(&self, path: &str, content: &[u8]) -> Result<(), StoreError> {
        let file = self.document_path(path)?;
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("mkdir {}: {e}", parent.display())))?;
        }
        let mut tmp = file.clone().into_os_string();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, content)
            .map_err(|e| StoreError::Backend(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &file)
            .map_err(|e| StoreError::Backend(format!("rename {}: {e}", file.display())))
    }

    fn record(&self, info: &CommitInfo) -> Result<(), StoreError> {
        let line = serde_json::to_string(info)
            .map_err(|e| StoreError::Backend(format!("history entry: {e}")))?;
        let mut log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.base.join(HISTORY_FILE))
            .map_err(|e| StoreError::Backend(format!("open history: {e}")))?;
        writeln!(log, "{line}").map_err(|e| StoreError::Backend(format!("append history: {e}")))
    }

    /// The document is already in place, so a history failure must not turn
    /// the write into a reported error.
    fn record_written(&self, path: &str, message: &str, version: &VersionToken) {
        let info = CommitInfo {
            path: path.to_string(),
            message: message.to_string(),
            version: version.clone(),
        };
        if let Err(e) = self.record(&info) {
            tracing::warn!("Wrote {} but could not record it in history: {}", path, e);
        }
    }

    /// Accepted writes recorded under this directory, oldest first.
    pub fn history(&self) -> Vec<CommitInfo> {
        std::fs::read_to_string(self.base.join(HISTORY_FILE))
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl ContentStore for FileStore {
    async fn fetch(&self, path: &str) -> Result<VersionedDocument, StoreError> {
        let content = self.read(path)?;
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
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.read(path)?;
        if VersionToken::from(blob_sha(&current)) != *expected {
            return Err(StoreError::Conflict {
                path: path.to_string(),
            });
        }

        self.write(path, &content)?;
        let version: VersionToken = blob_sha(&content).into();
        self.record_written(path, message, &version);
        Ok(version)
    }

    async fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.document_path(path)?.exists() {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }

        self.write(path, &content)?;
        let version: VersionToken = blob_sha(&content).into();
        self.record_written(path, message, &version);
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::Repository;

    #[tokio::test]
    async fn test_file_store_roundtrip_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::new(dir.path().to_path_buf());
        let created = store
            .create("usuarios.json", b"[]".to_vec(), "init users")
            .await
            .unwrap();

        // Re-open from same directory
        let store2 = FileStore::new(dir.path().to_path_buf());
        let doc = store2.fetch("usuarios.json").await.unwrap();
        assert_eq!(doc.content, b"[]");
        assert_eq!(doc.version, created);
        assert_eq!(store2.history().len(), 1);
        assert_eq!(store2.history()[0].message, "init users");
    }

    #[tokio::test]
    async fn test_file_store_detects_stale_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        store
            .create("EMEF PA-RESSACA.docx", b"v0".to_vec(), "seed")
            .await
            .unwrap();

        let stale = store.fetch("EMEF PA-RESSACA.docx").await.unwrap();
        let repo = Repository::new(store.clone());
        repo.update("EMEF PA-RESSACA.docx", "first", |_| Ok::<_, ()>(b"v1".to_vec()))
            .await
            .unwrap();

        let err = store
            .commit("EMEF PA-RESSACA.docx", b"v2".to_vec(), &stale.version, "late")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(
            store.fetch("EMEF PA-RESSACA.docx").await.unwrap().content,
            b"v1"
        );
    }

    #[tokio::test]
    async fn test_file_store_refuses_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        for bad in ["../outside.json", "/etc/passwd", ""] {
            assert!(matches!(
                store.fetch(bad).await.unwrap_err(),
                StoreError::Backend(_)
            ));
        }
    }

    #[tokio::test]
    async fn test_commit_survives_unwritable_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        let v0 = store
            .create("usuarios.json", b"[]".to_vec(), "init")
            .await
            .unwrap();

        // a directory where the log file should be makes every append fail
        std::fs::remove_file(dir.path().join(HISTORY_FILE)).unwrap();
        std::fs::create_dir(dir.path().join(HISTORY_FILE)).unwrap();

        let v1 = store
            .commit("usuarios.json", b"[1]".to_vec(), &v0, "add")
            .await
            .unwrap();
        let doc = store.fetch("usuarios.json").await.unwrap();
        assert_eq!(doc.content, b"[1]");
        assert_eq!(doc.version, v1);
        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.fetch("missing.docx").await.unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }
}
