//! Key layout for the persistence layer.
//!
//! Four logical collections share one ordered keyspace, distinguished by
//! ASCII prefixes. Values are zstd-compressed tile bytes under `tiles:` and
//! JSON everywhere else.
//!
//! ```text
//! tiles:<64-hex>      compressed raw RGB tile bytes
//! deltas:<64-hex>     JSON { BaseID, Delta }
//! images:<image-id>   JSON manifest
//! features:<64-hex>   JSON feature vector
//! ```

/// Prefix of the tile collection.
pub const TILES_PREFIX: &str = "tiles:";

/// Prefix of the delta collection.
pub const DELTAS_PREFIX: &str = "deltas:";

/// Prefix of the manifest collection.
pub const IMAGES_PREFIX: &str = "images:";

/// Prefix of the feature collection.
pub const FEATURES_PREFIX: &str = "features:";

/// Key of a stored tile.
pub fn tile_key(tile_id: &str) -> Vec<u8> {
    [TILES_PREFIX.as_bytes(), tile_id.as_bytes()].concat()
}

/// Key of a stored delta.
pub fn delta_key(tile_id: &str) -> Vec<u8> {
    [DELTAS_PREFIX.as_bytes(), tile_id.as_bytes()].concat()
}

/// Key of a stored manifest.
pub fn image_key(image_id: &str) -> Vec<u8> {
    [IMAGES_PREFIX.as_bytes(), image_id.as_bytes()].concat()
}

/// Key of a stored feature vector.
pub fn features_key(tile_id: &str) -> Vec<u8> {
    [FEATURES_PREFIX.as_bytes(), tile_id.as_bytes()].concat()
}

/// Smallest key strictly greater than every key carrying `prefix`.
///
/// Increments the last byte, dropping trailing `0xFF` bytes first. Returns
/// `None` when no such bound exists (empty or all-`0xFF` prefix), in which
/// case iteration is unbounded above.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut bound = prefix.to_vec();
    while matches!(bound.last(), Some(0xFF)) {
        bound.pop();
    }
    match bound.last_mut() {
        Some(last) => {
            *last += 1;
            Some(bound)
        }
        None => None,
    }
}
