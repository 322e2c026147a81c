use crate::Metadata;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

const DEFAULT_CAPACITY: usize = 256;

static SHARED_CACHE: OnceLock<PreviewCache> = OnceLock::new();

/// Key → metadata store shared by every orchestrator that previews links.
///
/// The handle is cheap to clone; clones observe the same entries. Entries
/// are written on first successful fetch, overwritten on refetch, and never
/// evicted: the cache lives for the process lifetime and unbounded growth is
/// an accepted limitation. `DashMap` keeps `get`/`put` atomic with respect
/// to each other, so no external locking is needed even off the single
/// runtime thread.
#[derive(Clone)]
pub struct PreviewCache {
    entries: Arc<DashMap<String, Metadata>>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    /// The process-wide instance used when no cache is injected, lazily
    /// constructed on first use and never torn down.
    pub fn shared() -> Self {
        SHARED_CACHE.get_or_init(Self::new).clone()
    }

    pub fn get(&self, key: &str) -> Option<Metadata> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Inserts or overwrites; the value's shape is not validated.
    pub fn put(&self, key: impl Into<String>, metadata: Metadata) {
        self.entries.insert(key.into(), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reset hook for tests; production code never deletes entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
