//! # Content fingerprints
//!
//! Every document a [`crate::ContentStore`] hands out is paired with a version
//! token. The remote store (GitHub) uses the git blob id of the file as that
//! token, so the in-process backends compute exactly the same value: the SHA-1
//! of `"blob {len}\0{content}"`. A document that has not changed therefore has
//! the same token no matter which backend served it.
//!
//! - [`Sha`]: a 20-byte SHA-1 with hex round-tripping.
//! - [`blob_sha`]: the git blob id of a byte slice.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// A 20-byte SHA-1 hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha(pub [u8; 20]);

impl Sha {
    /// Create a Sha from a hex string.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 40 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Sha(bytes))
    }

    /// Return the hex string representation.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Sha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Git blob id of `content`: SHA-1 over `"blob {size}\0{content}"`.
pub fn blob_sha(content: &[u8]) -> Sha {
    let header = format!("blob {}\0", content.len());

    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(content);
    let result = hasher.finalize();
    let mut sha_bytes = [0u8; 20];
    sha_bytes.copy_from_slice(&result);

    Sha(sha_bytes)
}
