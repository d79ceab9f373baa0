//! Persistence layer.
//!
//! An ordered byte-keyed key-value store (sled) holding four prefix-scoped
//! collections: `tiles:`, `deltas:`, `images:`, and `features:`. Supports
//! point reads and writes, prefix-bounded iteration, and atomic write
//! batches; see [`keys`] for the exact layout.

pub mod db;
pub mod keys;

pub use db::{Database, WriteBatch};
pub use keys::{
    delta_key, features_key, image_key, prefix_successor, tile_key, DELTAS_PREFIX,
    FEATURES_PREFIX, IMAGES_PREFIX, TILES_PREFIX,
};
