//! In-memory similarity index.
//!
//! Holds one feature vector per stored unique tile and answers
//! nearest-neighbor queries by linear scan. The index contains no raster
//! bytes; it is rebuilt at open by scanning the persisted `features:`
//! collection.
//!
//! Candidate selection is two-stage: the feature distance prunes to a short
//! candidate list, then the pixel distance (computed over fetched tile bytes)
//! verifies the match. A candidate whose bytes cannot be fetched is skipped;
//! a later candidate or direct storage remains a valid fallback.

use tracing::debug;

use crate::error::StoreError;
use crate::tile::delta::pixel_distance;
use crate::tile::TileId;

use super::features::{extract_features, feature_distance, TileFeatures};

/// Number of feature-space candidates examined by the pixel-verified search.
const PIXEL_CHECK_CANDIDATES: usize = 5;

/// In-memory collection of `(tile ID, feature vector)` pairs.
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    features: Vec<TileFeatures>,
    tile_size: usize,
}

impl SimilarityIndex {
    /// Create an empty index for tiles of the given edge length.
    pub fn new(tile_size: usize) -> Self {
        Self {
            features: Vec::new(),
            tile_size,
        }
    }

    /// Number of tiles in the index.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the index holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Extract features from tile bytes and append them to the index.
    pub fn add(&mut self, tile_id: TileId, data: &[u8]) -> Result<(), StoreError> {
        let features = extract_features(tile_id, data, self.tile_size)?;
        self.features.push(features);
        Ok(())
    }

    /// Append an already-extracted feature vector (used when rebuilding from
    /// the persisted `features:` collection).
    pub fn insert_features(&mut self, features: TileFeatures) {
        self.features.push(features);
    }

    /// Remove the first entry matching `tile_id`, if any.
    pub fn remove(&mut self, tile_id: &str) {
        if let Some(pos) = self.features.iter().position(|f| f.tile_id == tile_id) {
            self.features.swap_remove(pos);
        }
    }

    /// Find the single closest tile by feature distance.
    ///
    /// Returns `(Some(id), dist)` when the minimum distance is within
    /// `threshold`, otherwise `(None, min_dist)`. On an empty index the
    /// distance is `f64::INFINITY`.
    pub fn find_best(
        &self,
        data: &[u8],
        threshold: f64,
    ) -> Result<(Option<TileId>, f64), StoreError> {
        let query = extract_features(TileId::new(), data, self.tile_size)?;

        let mut best: Option<&TileFeatures> = None;
        let mut best_dist = f64::INFINITY;
        for candidate in &self.features {
            let dist = feature_distance(&query, candidate);
            if dist < best_dist {
                best_dist = dist;
                best = Some(candidate);
            }
        }

        match best {
            Some(features) if best_dist <= threshold => {
                Ok((Some(features.tile_id.clone()), best_dist))
            }
            _ => Ok((None, best_dist)),
        }
    }

    /// The `n` closest tiles by feature distance, ascending.
    pub fn find_top_n(&self, data: &[u8], n: usize) -> Result<Vec<(TileId, f64)>, StoreError> {
        let query = extract_features(TileId::new(), data, self.tile_size)?;

        let mut scored: Vec<(TileId, f64)> = self
            .features
            .iter()
            .map(|f| (f.tile_id.clone(), feature_distance(&query, f)))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(n);
        Ok(scored)
    }

    /// Find the best candidate by feature distance, then verify it at the
    /// pixel level.
    ///
    /// Walks the top candidates in feature-distance order, stopping once a
    /// candidate's feature distance exceeds `feature_threshold`. For each
    /// remaining candidate, `fetch` supplies the tile bytes and the
    /// perceptual pixel distance is computed; the closest candidate is
    /// returned iff its pixel distance is within `pixel_threshold`.
    ///
    /// Fetch or comparison failures skip that candidate.
    pub fn best_match_verified<F>(
        &self,
        data: &[u8],
        feature_threshold: f64,
        pixel_threshold: f64,
        mut fetch: F,
    ) -> Result<Option<(TileId, f64)>, StoreError>
    where
        F: FnMut(&TileId) -> Result<Vec<u8>, StoreError>,
    {
        let candidates = self.find_top_n(data, PIXEL_CHECK_CANDIDATES)?;

        let mut best: Option<TileId> = None;
        let mut best_pixel_dist = f64::INFINITY;

        for (candidate_id, feature_dist) in candidates {
            if feature_dist > feature_threshold {
                // Candidates are sorted; the rest are even farther
                break;
            }

            let candidate_data = match fetch(&candidate_id) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(tile_id = %candidate_id, error = %e, "skipping candidate: fetch failed");
                    continue;
                }
            };

            let dist = match pixel_distance(data, &candidate_data, self.tile_size) {
                Ok(dist) => dist,
                Err(e) => {
                    debug!(tile_id = %candidate_id, error = %e, "skipping candidate: pixel compare failed");
                    continue;
                }
            };

            if dist < best_pixel_dist {
                best_pixel_dist = dist;
                best = Some(candidate_id);
            }
        }

        match best {
            Some(id) if best_pixel_dist <= pixel_threshold => Ok(Some((id, best_pixel_dist))),
            _ => Ok(None),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
