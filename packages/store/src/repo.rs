//! # Repository: conditional read/mutate/write over a content store
//!
//! [`ContentStore`] is the seam between the application and wherever its
//! documents live (the GitHub contents API, a local directory, memory). It is a
//! key/blob store with optimistic concurrency: every read returns a
//! [`VersionToken`] and every overwrite must present the token it read.
//!
//! ## [`ContentStore`] trait
//!
//! | Method | Contract |
//! |--------|----------|
//! | `fetch` | Current bytes and token, or [`StoreError::NotFound`]. |
//! | `commit` | Replace the document iff its token still equals `expected`; returns the new token. A stale token is [`StoreError::Conflict`] and the document is left untouched. |
//! | `create` | First write of a path that does not exist yet; [`StoreError::AlreadyExists`] otherwise. |
//!
//! ## [`Repository`]
//!
//! Wraps a store and owns the one write pattern the application uses: fetch the
//! document *fresh*, apply a pure mutation to its bytes, commit with the token
//! that was just read. The token never outlives a single call, so the window in
//! which another writer can slip in is as short as the store round-trips allow.
//! Nothing here retries: a conflict goes back to the caller, who decides.

use std::future::Future;

use crate::models::{VersionToken, VersionedDocument};

/// Failures reported by a [`ContentStore`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {path}")]
    NotFound { path: String },

    #[error("version token for {path} is stale")]
    Conflict { path: String },

    #[error("document already exists: {path}")]
    AlreadyExists { path: String },

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Async key/blob store with optimistic concurrency.
pub trait ContentStore {
    fn fetch(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<VersionedDocument, StoreError>> + Send;
    fn commit(
        &self,
        path: &str,
        content: Vec<u8>,
        expected: &VersionToken,
        message: &str,
    ) -> impl Future<Output = Result<VersionToken, StoreError>> + Send;
    fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> impl Future<Output = Result<VersionToken, StoreError>> + Send;
}

/// Why a [`Repository::update`] did not go through.
#[derive(Debug)]
pub enum UpdateError<E> {
    /// The store refused the read or the write.
    Store(StoreError),
    /// The mutation rejected the current content; nothing was written.
    Mutate(E),
}

/// Conditional-write helper over a [`ContentStore`].
pub struct Repository<S: ContentStore> {
    store: S,
}

impl<S: ContentStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a document and its current token.
    pub async fn fetch(&self, path: &str) -> Result<VersionedDocument, StoreError> {
        self.store.fetch(path).await
    }

    /// First write of a document.
    pub async fn create(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
    ) -> Result<VersionToken, StoreError> {
        self.store.create(path, content, message).await
    }

    /// Fetch `path`, rewrite it with `mutate`, and commit against the token
    /// just read. Returns the token of the new content.
    pub async fn update<F, E>(
        &self,
        path: &str,
        message: &str,
        mutate: F,
    ) -> Result<VersionToken, UpdateError<E>>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, E>,
    {
        let current = self.store.fetch(path).await.map_err(UpdateError::Store)?;
        let next = mutate(&current.content).map_err(UpdateError::Mutate)?;
        self.store
            .commit(path, next, &current.version, message)
            .await
            .map_err(UpdateError::Store)
    }

    /// Like [`update`](Self::update), but a missing document is handed to
    /// `mutate` as `None` and written with `create`. Losing a race to another
    /// creator is reported as a conflict.
    pub async fn update_or_create<F, E>(
        &self,
        path: &str,
        message: &str,
        mutate: F,
    ) -> Result<VersionToken, UpdateError<E>>
    where
        F: FnOnce(Option<&[u8]>) -> Result<Vec<u8>, E>,
    {
        match self.store.fetch(path).await {
            Ok(current) => {
                let next = mutate(Some(&current.content)).map_err(UpdateError::Mutate)?;
                self.store
                    .commit(path, next, &current.version, message)
                    .await
                    .map_err(UpdateError::Store)
            }
            Err(StoreError::NotFound { .. }) => {
                let next = mutate(None).map_err(UpdateError::Mutate)?;
                self.store
                    .create(path, next, message)
                    .await
                    .map_err(|e| match e {
                        StoreError::AlreadyExists { path } => {
                            UpdateError::Store(StoreError::Conflict { path })
                        }
                        other => UpdateError::Store(other),
                    })
            }
            Err(e) => Err(UpdateError::Store(e)),
        }
    }
}
