//! Content-addressed tile identity.
//!
//! A tile's identity is the SHA-256 of its raw RGB bytes, rendered as
//! lowercase hex. Two tiles with equal bytes always have equal IDs, which is
//! what makes cross-image deduplication a pure key lookup.

use sha2::{Digest, Sha256};

/// A tile identifier: the lowercase hex SHA-256 of the tile's bytes.
pub type TileId = String;

/// Length of a hex-encoded tile ID.
pub const TILE_ID_LEN: usize = 64;

/// Compute the SHA-256 content hash of tile data.
pub fn tile_hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the textual tile ID from a content hash.
pub fn tile_id_from_hash(hash: &[u8; 32]) -> TileId {
    hex::encode(hash)
}

/// Compute the tile ID directly from tile data.
pub fn tile_id(data: &[u8]) -> TileId {
    tile_id_from_hash(&tile_hash(data))
}
