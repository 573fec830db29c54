//! In-memory snapshot store shared by the refresh loops and the HTTP path.
//!
//! Values are immutable `Bytes` replaced whole on every publish, so a reader
//! gets either the previous or the new content, never a mix. Writers hold a
//! [`SnapshotStore`]; the HTTP path only ever sees a [`SnapshotReader`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

#[derive(Debug, Default)]
struct Shared {
    entries: DashMap<String, Bytes>,
    writes: AtomicU64,
}

/// Write handle. Cloned into each track's refresh loop.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    shared: Arc<Shared>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the content under `key`.
    pub fn publish(&self, key: impl Into<String>, content: Bytes) {
        self.shared.entries.insert(key.into(), content);
        self.shared.writes.fetch_add(1, Ordering::Release);
    }

    /// Read-only view for request handling.
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.reader().get(key)
    }

    /// Total number of publishes since creation.
    pub fn writes(&self) -> u64 {
        self.shared.writes.load(Ordering::Acquire)
    }
}

/// Read-only view of the snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    shared: Arc<Shared>,
}

impl SnapshotReader {
    /// Current content for `key`. Cloning `Bytes` only bumps a refcount.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.shared.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shared.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.shared.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.entries.is_empty()
    }
}
