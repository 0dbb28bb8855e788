//! Digest-keyed cache of resolved manifests.
//!
//! Entries are `Arc<ResolvedManifest>` keyed by the SHA-256 chain digest.
//! Reads are concurrent; population takes the write lock, so each key has
//! a single writer and a lost insert race simply adopts the winner's
//! entry. The cache is only populated with fully folded results, so a
//! cancelled resolution can never leave a partial entry behind.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::resolver::ResolvedManifest;

/// Default maximum number of cached resolutions.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Bounded, digest-keyed resolution cache.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<[u8; 32], Arc<ResolvedManifest>>>,
    capacity: usize,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ResolutionCache {
    /// Creates a cache bounded to `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Looks up a resolution by chain digest.
    pub async fn get(&self, digest: &[u8; 32]) -> Option<Arc<ResolvedManifest>> {
        self.entries.read().await.get(digest).cloned()
    }

    /// Inserts a resolution, returning the entry that ends up cached.
    ///
    /// If another writer populated the key first, its entry wins and is
    /// returned. At capacity the value is returned uncached; resolution
    /// stays correct, only the reuse optimization degrades.
    pub async fn insert(
        &self,
        digest: [u8; 32],
        resolved: Arc<ResolvedManifest>,
    ) -> Arc<ResolvedManifest> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&digest) {
            return Arc::clone(existing);
        }
        if entries.len() >= self.capacity {
            debug!(
                capacity = self.capacity,
                "resolution cache at capacity; returning uncached entry"
            );
            return resolved;
        }
        entries.insert(digest, Arc::clone(&resolved));
        resolved
    }

    /// Number of cached resolutions.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true when the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
