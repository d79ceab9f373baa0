//! Tile similarity search.
//!
//! Two-stage matching for delta-eligible tiles: a cheap feature-vector
//! distance prunes candidates, then a pixel-level distance over the actual
//! tile bytes verifies the survivors.
//!
//! # Components
//!
//! - [`TileFeatures`]: quantized histogram + channel means + brightness +
//!   contrast, extracted deterministically from tile bytes
//! - [`SimilarityIndex`]: in-memory feature collection with linear-scan
//!   nearest-neighbor queries

pub mod features;
pub mod index;

pub use features::{extract_features, feature_distance, TileFeatures, HISTOGRAM_BINS};
pub use index::SimilarityIndex;
