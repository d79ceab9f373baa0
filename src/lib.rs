//! tilestore - deduplicating tile-based image storage.
//!
//! This library stores collections of similar raster images (typically
//! website screenshots) in far less space than their independently-encoded
//! sum, while retrieving any image losslessly by identifier. Images are
//! split into fixed-size tiles addressed by the SHA-256 of their bytes;
//! identical tiles are stored once, and near-duplicate tiles can be stored
//! as compressed deltas against a similar base tile.

pub mod codec;
pub mod config;
pub mod error;
pub mod server;
pub mod similarity;
pub mod storage;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use codec::{decode_raster, encode_png, Raster};
pub use config::Config;
pub use error::StoreError;
pub use server::{create_router, AppState, RouterConfig};
pub use similarity::{extract_features, feature_distance, SimilarityIndex, TileFeatures};
pub use storage::{Database, WriteBatch};
pub use store::{
    ImageStore, StorageStats, StorageType, StoreOptions, StoredImage, TileCache, TileDelta,
    TileRef,
};
pub use tile::{tile_hash, tile_id, ExtractedTile, Tile, TileGrid, TileId};
