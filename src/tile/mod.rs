//! Tiling, tile identity, and the tile delta codec.
//!
//! A raster is split into fixed-size square tiles of raw 8-bit RGB samples.
//! Each tile is identified by the SHA-256 of its bytes, so identical regions
//! across images collapse to a single stored copy. Near-duplicate tiles can
//! additionally be stored as a compressed per-sample delta against a base
//! tile.
//!
//! # Components
//!
//! - [`TileGrid`]: splits rasters into tiles and reassembles them
//! - [`identity`]: SHA-256 content hashing and hex tile IDs
//! - [`delta`]: clamped signed-difference codec with gzip compression

pub mod delta;
pub mod grid;
pub mod identity;

pub use grid::{ExtractedTile, Tile, TileGrid};
pub use identity::{tile_hash, tile_id, tile_id_from_hash, TileId, TILE_ID_LEN};
