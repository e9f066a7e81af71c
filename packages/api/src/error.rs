//! # Error taxonomy
//!
//! Every operation in this crate reports one [`CoreError`]. The variants are the
//! distinctions a caller needs to decide between "reload and resubmit",
//! "fix the input" and "tell an administrator":
//!
//! | Variant | Meaning | Retry? |
//! |---------|---------|--------|
//! | [`Fetch`](CoreError::Fetch) | Document unreachable or unparsable on read. | Later |
//! | [`Conflict`](CoreError::Conflict) | Someone committed between our read and our write. | Re-invoke (fresh read) |
//! | [`Structural`](CoreError::Structural) | Document lacks the expected table/row shape. | No |
//! | [`Validation`](CoreError::Validation) | Input rejected before any write was attempted. | After fixing input |
//! | [`Store`](CoreError::Store) | Transport or backend failure while writing. | Later |
//! | [`Unauthorized`](CoreError::Unauthorized) | Caller may not perform the operation. | No |
//! | [`NotFound`](CoreError::NotFound) | The named account or document does not exist. | No |
//!
//! Nothing in this crate retries on its own.

use store::{StoreError, UpdateError};

use crate::docx::DocxError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("could not read {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("{path} was changed by someone else; reload and try again")]
    Conflict { path: String },

    #[error("unexpected document shape in {path}: {reason}")]
    Structural { path: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error("could not save {path}: {reason}")]
    Store { path: String, reason: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl CoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Fetch { .. } => "fetch_failed",
            CoreError::Conflict { .. } => "conflict",
            CoreError::Structural { .. } => "structural",
            CoreError::Validation(_) => "validation",
            CoreError::Store { .. } => "store_failed",
            CoreError::Unauthorized(_) => "unauthorized",
            CoreError::NotFound(_) => "not_found",
        }
    }

    /// Whether simply invoking the operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Conflict { .. } | CoreError::Fetch { .. } | CoreError::Store { .. }
        )
    }

    /// Map a failed read.
    pub(crate) fn from_read(path: &str, err: StoreError) -> Self {
        CoreError::Fetch {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }

    /// Map a failed write.
    pub(crate) fn from_write(path: &str, err: StoreError) -> Self {
        match err {
            StoreError::Conflict { path } => CoreError::Conflict { path },
            StoreError::NotFound { .. } => CoreError::Fetch {
                path: path.to_string(),
                reason: err.to_string(),
            },
            other => CoreError::Store {
                path: path.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Map a failed `.docx` parse or rewrite.
    pub(crate) fn from_docx(path: &str, err: DocxError) -> Self {
        CoreError::Structural {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Map a failed [`store::Repository::update`] whose mutation already speaks
/// [`CoreError`].
pub(crate) fn from_update(path: &str, err: UpdateError<CoreError>) -> CoreError {
    match err {
        UpdateError::Store(e) => CoreError::from_write(path, e),
        UpdateError::Mutate(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_distinct_from_transport() {
        let conflict = CoreError::from_write(
            "a.docx",
            StoreError::Conflict {
                path: "a.docx".into(),
            },
        );
        let transport = CoreError::from_write("a.docx", StoreError::Backend("timeout".into()));

        assert_eq!(conflict.code(), "conflict");
        assert_eq!(transport.code(), "store_failed");
        assert!(conflict.is_retryable());
        assert!(!CoreError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_mutation_error_passes_through() {
        let err = from_update(
            "a.docx",
            UpdateError::Mutate(CoreError::Structural {
                path: "a.docx".into(),
                reason: "no table".into(),
            }),
        );
        assert_eq!(err.code(), "structural");
    }
}
