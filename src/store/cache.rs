//! Cache for materialized tiles.
//!
//! Retrieval resolves tiles by content hash, decompressing direct tiles and
//! replaying deltas against their bases. Both are pure functions of immutable
//! stored data, so resolved tiles are cached in an LRU keyed by tile ID and
//! never invalidated.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached tile bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bytes::Bytes;
use lru::LruCache;

use crate::tile::TileId;

/// Default cache capacity: 64MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 64 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// LRU cache of materialized tile bytes with size-based capacity.
///
/// Thread-safe; shared between concurrent readers via the store.
pub struct TileCache {
    inner: Mutex<Inner>,
    max_size: usize,
}

struct Inner {
    cache: LruCache<TileId, Bytes>,
    current_size: usize,
}

impl TileCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a cache bounded to `max_size` bytes of tile data.
    pub fn with_capacity(max_size: usize) -> Self {
        let entries = NonZeroUsize::new(DEFAULT_MAX_ENTRIES).expect("constant is non-zero");
        Self {
            inner: Mutex::new(Inner {
                cache: LruCache::new(entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    /// Look up a tile, marking it most recently used.
    pub fn get(&self, tile_id: &str) -> Option<Bytes> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.cache.get(tile_id).cloned()
    }

    /// Insert a tile, evicting least-recently-used entries until the total
    /// size fits the capacity.
    ///
    /// Tiles larger than the whole capacity are not cached.
    pub fn put(&self, tile_id: TileId, data: Bytes) {
        if data.len() > self.max_size {
            return;
        }

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(old) = inner.cache.put(tile_id, data.clone()) {
            inner.current_size -= old.len();
        }
        inner.current_size += data.len();

        while inner.current_size > self.max_size {
            match inner.cache.pop_lru() {
                Some((_, evicted)) => inner.current_size -= evicted.len(),
                None => break,
            }
        }
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.cache.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently cached.
    pub fn current_size(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.current_size
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
