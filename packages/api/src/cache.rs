//! Short-lived cache for document reads.
//!
//! Only read paths go through it. Writers always fetch from the store, and
//! drop the entry once their commit lands. Each path carries a generation that
//! every invalidation bumps; a reader passes the generation it saw before its
//! fetch, and its result is discarded if a write happened in the meantime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use store::VersionedDocument;

struct Entry {
    document: VersionedDocument,
    fetched_at: Instant,
}

#[derive(Default)]
struct Paths {
    entries: HashMap<String, Entry>,
    generations: HashMap<String, u64>,
}

pub(crate) struct ReadCache {
    ttl: Duration,
    paths: Mutex<Paths>,
}

impl ReadCache {
    /// A zero `ttl` disables caching.
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            paths: Mutex::new(Paths::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Paths> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self, path: &str) -> Option<VersionedDocument> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut paths = self.lock();
        paths.entries.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
        paths.entries.get(path).map(|e| e.document.clone())
    }

    /// Current generation of `path`; take it before fetching.
    pub(crate) fn generation(&self, path: &str) -> u64 {
        self.lock().generations.get(path).copied().unwrap_or(0)
    }

    /// Cache a document fetched under `generation`, unless the path has been
    /// invalidated since.
    pub(crate) fn insert(&self, path: &str, document: VersionedDocument, generation: u64) {
        if self.ttl.is_zero() {
            return;
        }
        let mut paths = self.lock();
        if paths.generations.get(path).copied().unwrap_or(0) != generation {
            return;
        }
        paths.entries.insert(
            path.to_string(),
            Entry {
                document,
                fetched_at: Instant::now(),
            },
        );
    }

    pub(crate) fn invalidate(&self, path: &str) {
        let mut paths = self.lock();
        paths.entries.remove(path);
        *paths.generations.entry(path.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::VersionToken;

    fn doc(content: &str) -> VersionedDocument {
        VersionedDocument {
            content: content.as_bytes().to_vec(),
            version: VersionToken::new("t"),
        }
    }

    #[test]
    fn test_zero_ttl_never_caches() {
        let cache = ReadCache::new(Duration::ZERO);
        cache.insert("a", doc("x"), 0);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_entries_expire_and_invalidate() {
        let cache = ReadCache::new(Duration::from_millis(30));
        cache.insert("a", doc("x"), cache.generation("a"));
        cache.insert("b", doc("y"), cache.generation("b"));
        assert_eq!(cache.get("a").unwrap().content, b"x");

        cache.invalidate("a");
        assert!(cache.get("a").is_none());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_read_started_before_invalidation_is_not_cached() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let seen = cache.generation("a");

        // a write lands while the read is in flight
        cache.invalidate("a");
        cache.insert("a", doc("old"), seen);
        assert!(cache.get("a").is_none());

        cache.insert("a", doc("new"), cache.generation("a"));
        assert_eq!(cache.get("a").unwrap().content, b"new");
    }
}
