//! # Versioned documents
//!
//! Types exchanged between a [`crate::ContentStore`] and its callers.
//!
//! | Type | Represents |
//! |------|-----------|
//! | [`VersionToken`] | Opaque fingerprint of a document's exact content at read time. A write must present the token it read; the store rejects it once the document has moved on. |
//! | [`VersionedDocument`] | The raw bytes of a document together with the token they were read under. |
//! | [`CommitInfo`] | One accepted write, kept by in-process backends as an audit trail. |

use serde::{Deserialize, Serialize};

use crate::objects::Sha;

/// Opaque version token issued by a content store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Sha> for VersionToken {
    fn from(sha: Sha) -> Self {
        Self(sha.to_hex())
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document bytes plus the token they were read under.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedDocument {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

/// An accepted write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub path: String,
    pub message: String,
    pub version: VersionToken,
}
