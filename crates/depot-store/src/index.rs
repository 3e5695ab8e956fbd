//! # Artifact Index
//!
//! Maps each artifact URI to its metadata. The pipelines depend only on the
//! [`ArtifactIndex`] trait; [`MemoryIndex`] is the in-process backend.
//!
//! ## Lifecycle
//!
//! `MemoryIndex` starts empty and lives as long as the process. Entries are
//! not persisted: after a restart the blobs remain on disk but are no longer
//! resolvable until re-ingested.

use std::collections::HashMap;
use std::sync::Arc;

use depot_core::Artifact;
use parking_lot::RwLock;

/// URI-keyed artifact registry shared by concurrent requests.
pub trait ArtifactIndex: Send + Sync + std::fmt::Debug {
    /// Insert or overwrite the entry for `artifact.uri`.
    ///
    /// Returns the entry that was replaced, if any.
    fn register(&self, artifact: Artifact) -> Option<Artifact>;

    /// Look up a single URI.
    fn resolve(&self, uri: &str) -> Option<Artifact>;

    /// Look up many URIs. The result has the same length and order as
    /// `uris`; unknown URIs yield `None` in their position.
    fn resolve_many(&self, uris: &[String]) -> Vec<Option<Artifact>> {
        uris.iter().map(|uri| self.resolve(uri)).collect()
    }

    /// Number of registered artifacts.
    fn len(&self) -> usize;

    /// Whether the index holds no artifacts.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`ArtifactIndex`].
///
/// The lock is `parking_lot` and is never held across an `.await`, so it is
/// safe to call from async handlers. Cloning shares the underlying map.
#[derive(Debug, Default, Clone)]
pub struct MemoryIndex {
    entries: Arc<RwLock<HashMap<String, Artifact>>>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactIndex for MemoryIndex {
    fn register(&self, artifact: Artifact) -> Option<Artifact> {
        self.entries.write().insert(artifact.uri.clone(), artifact)
    }

    fn resolve(&self, uri: &str) -> Option<Artifact> {
        self.entries.read().get(uri).cloned()
    }

    // One read guard for the whole batch so the result is a consistent snapshot.
    fn resolve_many(&self, uris: &[String]) -> Vec<Option<Artifact>> {
        let entries = self.entries.read();
        uris.iter().map(|uri| entries.get(uri).cloned()).collect()
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
