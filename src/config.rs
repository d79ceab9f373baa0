//! Configuration management.
//!
//! Supports command-line arguments via clap, environment variables with the
//! `TILESTORE_` prefix, and sensible defaults for all optional settings.
//!
//! # Environment Variables
//!
//! - `TILESTORE_HOST` - Server bind address (default: 0.0.0.0)
//! - `TILESTORE_PORT` - Server port (default: 8080)
//! - `TILESTORE_DB_PATH` - Database path (default: ./imagestore.db)
//! - `TILESTORE_TILE_SIZE` - Tile edge length in pixels (default: 256)
//! - `TILESTORE_SIMILARITY_THRESHOLD` - Delta eligibility threshold (default: 0.05)
//! - `TILESTORE_ENABLE_DELTA_TILES` - Store near-duplicates as deltas (default: false)
//! - `TILESTORE_CACHE_BYTES` - Materialized-tile cache capacity (default: 64MB)
//! - `TILESTORE_MAX_UPLOAD` - Maximum upload size in bytes (default: 50MB)
//! - `TILESTORE_CORS_ORIGINS` - Allowed CORS origins (comma-separated)

use std::path::PathBuf;

use clap::Parser;

use crate::server::DEFAULT_MAX_UPLOAD_BYTES;
use crate::store::{
    StoreOptions, DEFAULT_DB_PATH, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TILE_CACHE_CAPACITY,
    DEFAULT_TILE_SIZE,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tilestore - deduplicating tile-based image storage.
///
/// Stores collections of similar images (e.g. website screenshots) by
/// splitting them into content-addressed tiles, deduplicating identical
/// tiles, and optionally delta-encoding near-duplicates.
#[derive(Parser, Debug, Clone)]
#[command(name = "tilestore")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "TILESTORE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "TILESTORE_PORT")]
    pub port: u16,

    // =========================================================================
    // Store Configuration
    // =========================================================================
    /// Filesystem path of the backing database.
    #[arg(long, default_value = DEFAULT_DB_PATH, env = "TILESTORE_DB_PATH")]
    pub db_path: PathBuf,

    /// Tile edge length in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "TILESTORE_TILE_SIZE")]
    pub tile_size: usize,

    /// Feature/pixel distance threshold for delta eligibility (0.0 - 1.0).
    #[arg(
        long,
        default_value_t = DEFAULT_SIMILARITY_THRESHOLD,
        env = "TILESTORE_SIMILARITY_THRESHOLD"
    )]
    pub similarity_threshold: f64,

    /// Store near-duplicate tiles as compressed deltas against a base tile.
    #[arg(long, default_value_t = false, env = "TILESTORE_ENABLE_DELTA_TILES")]
    pub enable_delta_tiles: bool,

    /// Materialized-tile cache capacity in bytes.
    #[arg(
        long,
        default_value_t = DEFAULT_TILE_CACHE_CAPACITY,
        env = "TILESTORE_CACHE_BYTES"
    )]
    pub cache_bytes: usize,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Maximum accepted upload size in bytes.
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_UPLOAD_BYTES,
        env = "TILESTORE_MAX_UPLOAD"
    )]
    pub max_upload_bytes: usize,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "TILESTORE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 || self.tile_size > 4096 {
            return Err(format!(
                "tile_size must be between 1 and 4096, got {}",
                self.tile_size
            ));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            ));
        }

        if self.db_path.as_os_str().is_empty() {
            return Err("db_path cannot be empty".to_string());
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Store options derived from this configuration.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            tile_size: self.tile_size,
            similarity_threshold: self.similarity_threshold,
            db_path: self.db_path.clone(),
            enable_delta_tiles: self.enable_delta_tiles,
            tile_cache_bytes: self.cache_bytes,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
