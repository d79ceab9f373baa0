//! Store orchestrator.
//!
//! The public façade over tiling, deduplication, similarity search, delta
//! encoding, and persistence.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ImageStore                           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                    store_image()                       │  │
//! │  │  1. Decode raster     4. Similarity + delta decision   │  │
//! │  │  2. Extract tiles     5. Stage tiles/deltas/features   │  │
//! │  │  3. Dedup by hash     6. Stage manifest, commit batch  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                   retrieve_image()                     │  │
//! │  │  1. Fetch manifest    3. Reassemble raster             │  │
//! │  │  2. Resolve tiles     4. Encode PNG                    │  │
//! │  │     (delta → base, recursively, through the cache)     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │               │                │             │      │
//! │        ▼               ▼                ▼             ▼      │
//! │  ┌──────────┐  ┌───────────────┐  ┌───────────┐  ┌────────┐ │
//! │  │ TileGrid │  │SimilarityIndex│  │ TileCache │  │Database│ │
//! │  └──────────┘  └───────────────┘  └───────────┘  └────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! Writes (`store_image`, `delete_image`) are serialized by an internal
//! writer lock; reads run concurrently with each other and with the writer.
//! The similarity index is the only mutable shared state and is updated only
//! while the writer lock is held.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::{self, Raster};
use crate::error::StoreError;
use crate::similarity::{extract_features, SimilarityIndex, TileFeatures};
use crate::storage::{self, Database, WriteBatch};
use crate::tile::{delta, Tile, TileGrid, TileId};

pub mod cache;
pub mod debug;
pub mod manifest;

pub use cache::{TileCache, DEFAULT_TILE_CACHE_CAPACITY};
pub use manifest::{StorageStats, StorageType, StoredImage, TileDelta, TileRef};

// =============================================================================
// Options
// =============================================================================

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Default feature/pixel distance threshold for delta eligibility.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.05;

/// Default database path.
pub const DEFAULT_DB_PATH: &str = "./imagestore.db";

/// zstd compression level for stored tiles.
const ZSTD_LEVEL: i32 = 3;

/// Upper bound on delta chains followed during resolution. Written data
/// never chains (bases are always direct tiles), so hitting this means the
/// store is corrupt.
const MAX_DELTA_DEPTH: usize = 16;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Tile edge length in pixels
    pub tile_size: usize,

    /// Feature and pixel distance threshold for delta eligibility
    pub similarity_threshold: f64,

    /// Filesystem path of the backing database
    pub db_path: PathBuf,

    /// Whether near-duplicate tiles may be stored as deltas
    pub enable_delta_tiles: bool,

    /// Capacity of the materialized-tile cache in bytes
    pub tile_cache_bytes: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            enable_delta_tiles: false,
            tile_cache_bytes: DEFAULT_TILE_CACHE_CAPACITY,
        }
    }
}

impl StoreOptions {
    fn validate(&self) -> Result<(), StoreError> {
        if self.tile_size == 0 || self.tile_size > 4096 {
            return Err(StoreError::invalid_input(format!(
                "tile_size must be between 1 and 4096, got {}",
                self.tile_size
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(StoreError::invalid_input(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(StoreError::invalid_input(
                "db_path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Image Store
// =============================================================================

/// Deduplicating tile-based image store.
///
/// See the module docs for the write and read pipelines.
pub struct ImageStore {
    db: Database,
    grid: TileGrid,
    options: StoreOptions,
    index: RwLock<SimilarityIndex>,
    writer: Mutex<()>,
    cache: TileCache,
}

impl ImageStore {
    /// Open a store, creating the database if needed and rebuilding the
    /// similarity index from the persisted `features:` collection.
    pub fn open(options: StoreOptions) -> Result<Self, StoreError> {
        options.validate()?;

        let db = Database::open(&options.db_path)?;
        let mut index = SimilarityIndex::new(options.tile_size);

        for entry in db.iter_prefix(storage::FEATURES_PREFIX.as_bytes()) {
            let (key, value) = entry?;
            match serde_json::from_slice::<TileFeatures>(&value) {
                Ok(features) => index.insert_features(features),
                Err(e) => warn!(
                    key = %String::from_utf8_lossy(&key),
                    error = %e,
                    "skipping unreadable feature record"
                ),
            }
        }
        info!(tiles = index.len(), "similarity index rebuilt");

        let cache = TileCache::with_capacity(options.tile_cache_bytes);
        Ok(Self {
            db,
            grid: TileGrid::new(options.tile_size),
            options,
            index: RwLock::new(index),
            writer: Mutex::new(()),
            cache,
        })
    }

    /// The tile edge length this store was opened with.
    pub fn tile_size(&self) -> usize {
        self.grid.tile_size()
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Decode and store an image under the given identifier.
    ///
    /// Either the whole write batch lands durably or nothing does. Storing
    /// under an existing identifier replaces that image's manifest.
    pub fn store_image(&self, id: &str, data: &[u8]) -> Result<(), StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());

        // Tiles indexed during this call, unwound if the batch fails so the
        // index keeps reflecting only durable tiles.
        let mut indexed: Vec<TileId> = Vec::new();
        let result = self.store_image_locked(id, data, &mut index, &mut indexed);
        if result.is_err() {
            for tile_id in &indexed {
                index.remove(tile_id);
            }
        }
        result
    }

    fn store_image_locked(
        &self,
        id: &str,
        data: &[u8],
        index: &mut SimilarityIndex,
        indexed: &mut Vec<TileId>,
    ) -> Result<(), StoreError> {
        let raster = codec::decode_raster(data)?;
        let tiles = self.grid.extract(&raster);

        let mut batch = self.db.batch();
        let mut refs = Vec::with_capacity(tiles.len());
        let mut processed: HashSet<TileId> = HashSet::new();

        let mut duplicates = 0usize;
        let mut direct = 0usize;
        let mut deltas = 0usize;

        for extracted in &tiles {
            let tile = &extracted.tile;

            let storage_type = if self.is_stored(&tile.id)? || processed.contains(&tile.id) {
                duplicates += 1;
                StorageType::Duplicate
            } else if self.options.enable_delta_tiles
                && !index.is_empty()
                && self.try_stage_delta(&mut batch, index, tile)?
            {
                deltas += 1;
                processed.insert(tile.id.clone());
                StorageType::Delta
            } else {
                self.stage_unique(&mut batch, index, tile)?;
                indexed.push(tile.id.clone());
                processed.insert(tile.id.clone());
                direct += 1;
                StorageType::Unique
            };

            refs.push(TileRef {
                tile_x: extracted.tile_x,
                tile_y: extracted.tile_y,
                tile_id: tile.id.clone(),
                storage_type,
            });
        }

        let manifest = StoredImage {
            id: id.to_string(),
            width: raster.width,
            height: raster.height,
            tile_refs: refs,
            metadata: BTreeMap::new(),
            original_bytes: data.len() as u64,
        };
        batch.put(&storage::image_key(id), to_json(&manifest, "manifest")?);

        batch.commit(true)?;
        info!(
            image_id = id,
            tiles = tiles.len(),
            duplicates,
            direct,
            deltas,
            "image stored"
        );
        Ok(())
    }

    /// Whether this tile ID already resolves in the committed store, either
    /// as a direct tile or a delta.
    fn is_stored(&self, tile_id: &str) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(&storage::tile_key(tile_id))?
            || self.db.contains_key(&storage::delta_key(tile_id))?)
    }

    /// Stage a tile directly: compressed bytes plus its feature vector, and
    /// make it a similarity candidate for the rest of this batch.
    fn stage_unique(
        &self,
        batch: &mut WriteBatch<'_>,
        index: &mut SimilarityIndex,
        tile: &Tile,
    ) -> Result<(), StoreError> {
        let compressed = compress_tile(&tile.data)?;
        batch.put(&storage::tile_key(&tile.id), compressed);

        let features = extract_features(tile.id.clone(), &tile.data, self.grid.tile_size())?;
        batch.put(
            &storage::features_key(&tile.id),
            to_json(&features, "tile features")?,
        );
        index.insert_features(features);
        Ok(())
    }

    /// Attempt to store a tile as a delta against a similar base tile.
    ///
    /// Returns `true` when a delta was staged. A delta is elected only when a
    /// pixel-verified match exists, the delta saves at least 25% over the raw
    /// tile, and replaying it reproduces the tile exactly (the clamped
    /// difference encoding is lossy past ±127 per sample). Candidate
    /// failures fall back to direct storage.
    fn try_stage_delta(
        &self,
        batch: &mut WriteBatch<'_>,
        index: &SimilarityIndex,
        tile: &Tile,
    ) -> Result<bool, StoreError> {
        let threshold = self.options.similarity_threshold;
        let matched = index.best_match_verified(&tile.data, threshold, threshold, |candidate| {
            self.fetch_base_tile(batch, candidate)
        })?;
        let Some((base_id, pixel_dist)) = matched else {
            return Ok(false);
        };

        let base = match self.fetch_base_tile(batch, &base_id) {
            Ok(base) => base,
            Err(e) => {
                debug!(base_id = %base_id, error = %e, "base fetch failed, storing directly");
                return Ok(false);
            }
        };

        let tile_size = self.grid.tile_size();
        let encoded = match delta::encode_delta(&tile.data, &base, tile_size) {
            Ok(encoded) => encoded,
            Err(e) => {
                debug!(base_id = %base_id, error = %e, "delta encode failed, storing directly");
                return Ok(false);
            }
        };

        if encoded.len() >= tile.data.len() * 3 / 4 {
            debug!(
                tile_id = %tile.id,
                delta_bytes = encoded.len(),
                raw_bytes = tile.data.len(),
                "delta not worthwhile, storing directly"
            );
            return Ok(false);
        }

        match delta::apply_delta(&base, &encoded, tile_size) {
            Ok(replayed) if replayed == tile.data => {}
            _ => {
                debug!(tile_id = %tile.id, "delta replay inexact, storing directly");
                return Ok(false);
            }
        }

        let record = TileDelta {
            base_id,
            delta: encoded,
        };
        batch.put(
            &storage::delta_key(&tile.id),
            to_json(&record, "tile delta")?,
        );
        debug!(tile_id = %tile.id, pixel_dist, "tile stored as delta");
        Ok(true)
    }

    /// Fetch base tile bytes through the batch-plus-store view.
    ///
    /// Only the `tiles:` collection is consulted, so every delta base is a
    /// direct tile and chains never form.
    fn fetch_base_tile(
        &self,
        batch: &WriteBatch<'_>,
        tile_id: &TileId,
    ) -> Result<Vec<u8>, StoreError> {
        let compressed = batch.get(&storage::tile_key(tile_id))?.ok_or_else(|| {
            StoreError::corrupt(format!("base tile {tile_id} is not stored directly"))
        })?;
        let raw = decompress_tile(&compressed)?;
        self.check_tile_len(tile_id, &raw)?;
        Ok(raw)
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Reconstruct an image and encode it as PNG.
    pub fn retrieve_image(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let manifest = self.manifest(id)?;
        let raster = self.materialize(&manifest)?;
        codec::encode_png(&raster)
    }

    /// Fetch the manifest for an image.
    pub fn manifest(&self, id: &str) -> Result<StoredImage, StoreError> {
        let value = self
            .db
            .get(&storage::image_key(id))?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        serde_json::from_slice(&value)
            .map_err(|e| StoreError::corrupt(format!("unreadable manifest for {id}: {e}")))
    }

    /// Render the per-tile storage map for an image as PNG.
    pub fn retrieve_debug_image(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let manifest = self.manifest(id)?;
        let raster = debug::render_storage_map(&manifest, self.grid.tile_size());
        codec::encode_png(&raster)
    }

    fn materialize(&self, manifest: &StoredImage) -> Result<Raster, StoreError> {
        let mut canvas = Raster::blank(manifest.width, manifest.height);
        for tile_ref in &manifest.tile_refs {
            let data = self.resolve_tile(&tile_ref.tile_id, 0)?;
            self.grid
                .place(&mut canvas, tile_ref.tile_x, tile_ref.tile_y, &data)?;
        }
        Ok(canvas)
    }

    /// Materialize a tile by ID: a direct tile is decompressed, a delta is
    /// replayed against its (recursively resolved) base.
    fn resolve_tile(&self, tile_id: &str, depth: usize) -> Result<Bytes, StoreError> {
        if depth > MAX_DELTA_DEPTH {
            return Err(StoreError::corrupt(format!(
                "delta chain exceeds depth {MAX_DELTA_DEPTH} at tile {tile_id}"
            )));
        }

        if let Some(hit) = self.cache.get(tile_id) {
            return Ok(hit);
        }

        if let Some(compressed) = self.db.get(&storage::tile_key(tile_id))? {
            let raw = decompress_tile(&compressed)?;
            self.check_tile_len(tile_id, &raw)?;
            let bytes = Bytes::from(raw);
            self.cache.put(tile_id.to_string(), bytes.clone());
            return Ok(bytes);
        }

        if let Some(value) = self.db.get(&storage::delta_key(tile_id))? {
            let record: TileDelta = serde_json::from_slice(&value).map_err(|e| {
                StoreError::corrupt(format!("unreadable delta record for {tile_id}: {e}"))
            })?;
            let base = self.resolve_tile(&record.base_id, depth + 1)?;
            let raw = delta::apply_delta(&base, &record.delta, self.grid.tile_size())?;
            let bytes = Bytes::from(raw);
            self.cache.put(tile_id.to_string(), bytes.clone());
            return Ok(bytes);
        }

        Err(StoreError::corrupt(format!(
            "tile {tile_id} referenced by a manifest is not resolvable"
        )))
    }

    fn check_tile_len(&self, tile_id: &str, raw: &[u8]) -> Result<(), StoreError> {
        if raw.len() != self.grid.tile_bytes() {
            return Err(StoreError::corrupt(format!(
                "tile {tile_id} decompressed to {} bytes, expected {}",
                raw.len(),
                self.grid.tile_bytes()
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Management
    // =========================================================================

    /// Delete an image's manifest. Referenced tiles, deltas, and features
    /// are retained.
    pub fn delete_image(&self, id: &str) -> Result<(), StoreError> {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        if !self.db.contains_key(&storage::image_key(id))? {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        self.db.delete(&storage::image_key(id), true)?;
        info!(image_id = id, "image deleted");
        Ok(())
    }

    /// All stored image IDs in ascending order.
    pub fn list_images(&self) -> Result<Vec<String>, StoreError> {
        let prefix = storage::IMAGES_PREFIX.as_bytes();
        let mut ids = Vec::new();
        for entry in self.db.iter_prefix(prefix) {
            let (key, _) = entry?;
            ids.push(String::from_utf8_lossy(&key[prefix.len()..]).into_owned());
        }
        Ok(ids)
    }

    /// Aggregate storage statistics.
    ///
    /// Deleted images leave their tiles behind, so `unique_tiles` and
    /// `storage_bytes` count tiles no live manifest references.
    pub fn storage_stats(&self) -> Result<StorageStats, StoreError> {
        let mut stats = StorageStats::default();

        for entry in self.db.iter_prefix(storage::IMAGES_PREFIX.as_bytes()) {
            let (key, value) = entry?;
            let manifest: StoredImage = match serde_json::from_slice(&value) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "skipping unreadable manifest in stats"
                    );
                    continue;
                }
            };

            stats.total_images += 1;
            stats.total_tiles += manifest.tile_refs.len() as u64;
            stats.original_bytes += manifest.original_bytes;
            for tile_ref in &manifest.tile_refs {
                match tile_ref.storage_type {
                    StorageType::Unique => stats.direct_tiles += 1,
                    StorageType::Duplicate | StorageType::Delta => {
                        stats.deduplicated_tiles += 1
                    }
                    StorageType::Unknown => {}
                }
            }
        }

        for entry in self.db.iter_prefix(storage::TILES_PREFIX.as_bytes()) {
            let (_, value) = entry?;
            stats.unique_tiles += 1;
            stats.storage_bytes += value.len() as u64;
        }

        if stats.total_tiles > 0 {
            stats.direct_percent = stats.direct_tiles as f64 / stats.total_tiles as f64 * 100.0;
            stats.deduplicated_percent =
                stats.deduplicated_tiles as f64 / stats.total_tiles as f64 * 100.0;
        }
        if stats.original_bytes > 0 && stats.storage_bytes > 0 {
            stats.compression_ratio = stats.original_bytes as f64 / stats.storage_bytes as f64;
        }

        Ok(stats)
    }

    /// Flush and release the store.
    pub fn close(self) -> Result<(), StoreError> {
        self.db.flush()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn compress_tile(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    zstd::encode_all(data, ZSTD_LEVEL)
        .map_err(|e| StoreError::compression(format!("failed to compress tile: {e}")))
}

fn decompress_tile(compressed: &[u8]) -> Result<Vec<u8>, StoreError> {
    zstd::decode_all(compressed)
        .map_err(|e| StoreError::compression(format!("failed to decompress tile: {e}")))
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value)
        .map_err(|e| StoreError::invalid_input(format!("failed to encode {what}: {e}")))
}

// =============================================================================
// Tests
// =============================================================================
