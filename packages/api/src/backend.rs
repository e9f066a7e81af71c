//! The content store selected by `store.backend`.

use std::path::PathBuf;

use store::{ContentStore, FileStore, MemoryStore, StoreError, VersionToken, VersionedDocument};

use crate::github::GitHubStore;
use crate::settings::{BackendKind, StoreSettings};

#[derive(Clone, Debug)]
pub enum Backend {
    GitHub(GitHubStore),
    Local(FileStore),
    Memory(MemoryStore),
}

impl Backend {
    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        let backend = match settings.backend {
            BackendKind::Github => Backend::GitHub(GitHubStore::new(settings)?),
            BackendKind::Local => {
                Backend::Local(FileStore::new(PathBuf::from(&settings.local_root)))
            }
            BackendKind::Memory => Backend::Memory(MemoryStore::new()),
        };
        tracing::info!("Using {:?} document store", settings.backend);
        Ok(backend)
    }
}

impl ContentStore for Backend {
    async fn fetch(&self, path: &str) -> Result<VersionedDocument, StoreError> {
        match self {
            Backend::GitHub(s) => s.fetch(path).await,
            Backend::Local(s) => s.fetch(path).await,
            Backend::Memory(s) => s.fetch(path).await,
        }
    }

    async fn commit(
        &self,
        path: &str,
        content: Vec<u8>,
        expected: &VersionToken,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        match self {
            Backend::GitHub(s) => s.commit(path, content, expected, message).await,
            Backend::Local(s) => s.commit(path, content, expected, message).await,
            Backend::Memory(s) => s.commit(path, content, expected, message).await,
        }
    }

    async fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        match self {
            Backend::GitHub(s) => s.create(path, content, message).await,
            Backend::Local(s) => s.create(path, content, message).await,
            Backend::Memory(s) => s.create(path, content, message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::from_toml(&format!(
            "[store]\nbackend = \"local\"\nlocal_root = {:?}\n",
            dir.path().display().to_string()
        ))
        .unwrap();
        let backend = Backend::from_settings(&settings.store).unwrap();
        assert!(matches!(backend, Backend::Local(_)));

        let v1 = backend.create("usuarios.json", b"[]".to_vec(), "init").await.unwrap();
        let doc = backend.fetch("usuarios.json").await.unwrap();
        assert_eq!(doc.version, v1);
        assert_eq!(
            backend.create("usuarios.json", b"[]".to_vec(), "again").await.unwrap_err(),
            StoreError::AlreadyExists {
                path: "usuarios.json".into()
            }
        );
    }

    #[test]
    fn test_memory_backend_from_settings() {
        let settings = Settings::from_toml("[store]\nbackend = \"memory\"\n").unwrap();
        assert!(matches!(
            Backend::from_settings(&settings.store).unwrap(),
            Backend::Memory(_)
        ));
    }
}
