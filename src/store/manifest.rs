//! Persisted record types: manifests, tile references, deltas, statistics.
//!
//! Serialized field names and representations are part of the on-disk
//! contract (see the `storage` module docs); changing them breaks existing
//! databases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tile::TileId;

// =============================================================================
// Storage Type
// =============================================================================

/// How a tile reference was resolved at write time.
///
/// Provenance only: retrieval always resolves by tile ID regardless of this
/// tag. Persisted as an integer (`0`/`1`/`2`); unrecognized values decode as
/// [`StorageType::Unknown`] so old or corrupt manifests remain readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum StorageType {
    /// First physical copy of this tile content
    Unique,

    /// Content already stored by an earlier tile
    Duplicate,

    /// Stored as a delta against a base tile
    Delta,

    /// Unrecognized tag read back from disk; never written
    Unknown,
}

impl From<StorageType> for u8 {
    fn from(value: StorageType) -> Self {
        match value {
            StorageType::Unique => 0,
            StorageType::Duplicate => 1,
            StorageType::Delta => 2,
            StorageType::Unknown => u8::MAX,
        }
    }
}

impl From<u8> for StorageType {
    fn from(value: u8) -> Self {
        match value {
            0 => StorageType::Unique,
            1 => StorageType::Duplicate,
            2 => StorageType::Delta,
            _ => StorageType::Unknown,
        }
    }
}

// =============================================================================
// Tile Reference
// =============================================================================

/// A positioned tile reference within an image manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileRef {
    /// Grid column (0-indexed from left)
    #[serde(rename = "X")]
    pub tile_x: u32,

    /// Grid row (0-indexed from top)
    #[serde(rename = "Y")]
    pub tile_y: u32,

    /// Content-derived tile ID this reference resolves through
    #[serde(rename = "TileID")]
    pub tile_id: TileId,

    /// Write-time provenance tag
    #[serde(rename = "StorageType")]
    pub storage_type: StorageType,
}

// =============================================================================
// Stored Image
// =============================================================================

/// Per-image manifest: dimensions plus the row-major tile reference
/// sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredImage {
    /// Caller-supplied image identifier
    #[serde(rename = "ID")]
    pub id: String,

    /// Width in pixels
    #[serde(rename = "Width")]
    pub width: u32,

    /// Height in pixels
    #[serde(rename = "Height")]
    pub height: u32,

    /// Tile references in row-major tile order,
    /// `ceil(width/T) * ceil(height/T)` entries
    #[serde(rename = "TileRefs")]
    pub tile_refs: Vec<TileRef>,

    /// Free-form string metadata (currently always empty at write time)
    #[serde(rename = "Metadata", default)]
    pub metadata: BTreeMap<String, String>,

    /// Size of the encoded upload this image was stored from
    #[serde(rename = "OriginalBytes", default)]
    pub original_bytes: u64,
}

// =============================================================================
// Tile Delta Record
// =============================================================================

/// Persisted delta: base tile ID plus the compressed difference bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDelta {
    /// Tile the delta applies against
    #[serde(rename = "BaseID")]
    pub base_id: TileId,

    /// Length-prefixed gzip-compressed signed sample differences
    #[serde(rename = "Delta", with = "base64_bytes")]
    pub delta: Vec<u8>,
}

/// Base64 (standard alphabet, padded) byte-array representation, matching
/// how the manifest JSON encodes binary fields.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Storage Statistics
// =============================================================================

/// Aggregate statistics over the whole store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    /// Number of stored manifests
    #[serde(rename = "TotalImages")]
    pub total_images: u64,

    /// Total tile references across all manifests
    #[serde(rename = "TotalTiles")]
    pub total_tiles: u64,

    /// Number of physical tiles in the `tiles:` collection
    #[serde(rename = "UniqueTiles")]
    pub unique_tiles: u64,

    /// References stored as a new physical tile
    #[serde(rename = "DirectTiles")]
    pub direct_tiles: u64,

    /// References resolved by dedup or delta
    #[serde(rename = "DeduplicatedTiles")]
    pub deduplicated_tiles: u64,

    /// `direct_tiles / total_tiles`, as a percentage
    #[serde(rename = "DirectPercent")]
    pub direct_percent: f64,

    /// `deduplicated_tiles / total_tiles`, as a percentage
    #[serde(rename = "DeduplicatedPercent")]
    pub deduplicated_percent: f64,

    /// Sum of stored tile value lengths
    #[serde(rename = "StorageBytes")]
    pub storage_bytes: u64,

    /// Sum of encoded upload sizes across all manifests
    #[serde(rename = "OriginalBytes")]
    pub original_bytes: u64,

    /// `original_bytes / storage_bytes` when both are positive
    #[serde(rename = "CompressionRatio")]
    pub compression_ratio: f64,
}

// =============================================================================
// Tests
// =============================================================================
