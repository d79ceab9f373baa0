//! Raster tiler.
//!
//! Splits a raster into a grid of fixed-size RGB tiles and reassembles a
//! raster from positioned tiles.
//!
//! Tiles are produced in row-major order. A tile whose nominal source
//! rectangle extends past the raster's right or bottom edge is zero-padded:
//! only the in-bounds window carries real pixel data, the rest is (0, 0, 0).
//! Reassembly clips each tile against the raster bounds and discards the
//! padding, so `assemble(extract(r)) == r` on the in-bounds region.

use crate::codec::Raster;
use crate::error::StoreError;

use super::identity::{tile_hash, tile_id_from_hash, TileId};

// =============================================================================
// Tile
// =============================================================================

/// An in-memory tile: content hash, derived ID, and raw RGB bytes.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Lowercase hex SHA-256 of `data`
    pub id: TileId,

    /// SHA-256 content hash of `data`
    pub hash: [u8; 32],

    /// Raw RGB bytes, `tile_size * tile_size * 3` long
    pub data: Vec<u8>,
}

/// A tile extracted from a raster, together with its grid position.
#[derive(Debug, Clone)]
pub struct ExtractedTile {
    /// Grid column (0-indexed from left)
    pub tile_x: u32,

    /// Grid row (0-indexed from top)
    pub tile_y: u32,

    /// The tile itself
    pub tile: Tile,
}

// =============================================================================
// Tile Grid
// =============================================================================

/// Fixed-size tiler for a configured tile edge length.
#[derive(Debug, Clone, Copy)]
pub struct TileGrid {
    tile_size: usize,
}

impl TileGrid {
    /// Create a tiler for the given tile edge length in pixels.
    pub fn new(tile_size: usize) -> Self {
        Self { tile_size }
    }

    /// The configured tile edge length in pixels.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Byte length of one tile (`tile_size * tile_size * 3`).
    pub fn tile_bytes(&self) -> usize {
        self.tile_size * self.tile_size * 3
    }

    /// Grid dimensions `(columns, rows)` covering a raster of the given size.
    pub fn grid_dims(&self, width: u32, height: u32) -> (u32, u32) {
        let t = self.tile_size as u32;
        (width.div_ceil(t), height.div_ceil(t))
    }

    /// Split a raster into tiles in row-major order.
    pub fn extract(&self, raster: &Raster) -> Vec<ExtractedTile> {
        let (grid_x, grid_y) = self.grid_dims(raster.width, raster.height);
        let mut tiles = Vec::with_capacity(grid_x as usize * grid_y as usize);

        for tile_y in 0..grid_y {
            for tile_x in 0..grid_x {
                let data = self.extract_tile_data(raster, tile_x, tile_y);
                let hash = tile_hash(&data);
                tiles.push(ExtractedTile {
                    tile_x,
                    tile_y,
                    tile: Tile {
                        id: tile_id_from_hash(&hash),
                        hash,
                        data,
                    },
                });
            }
        }

        tiles
    }

    /// Copy the tile at grid position `(tile_x, tile_y)` out of a raster,
    /// zero-padding samples past the right/bottom edges.
    fn extract_tile_data(&self, raster: &Raster, tile_x: u32, tile_y: u32) -> Vec<u8> {
        let t = self.tile_size;
        let mut data = vec![0u8; self.tile_bytes()];

        let x0 = tile_x as usize * t;
        let y0 = tile_y as usize * t;
        let width = raster.width as usize;
        let height = raster.height as usize;

        // In-bounds window of this tile
        let copy_w = width.saturating_sub(x0).min(t);
        let copy_h = height.saturating_sub(y0).min(t);

        for row in 0..copy_h {
            let src = ((y0 + row) * width + x0) * 3;
            let dst = row * t * 3;
            data[dst..dst + copy_w * 3].copy_from_slice(&raster.data[src..src + copy_w * 3]);
        }

        data
    }

    /// Write a tile's in-bounds window into a raster at grid position
    /// `(tile_x, tile_y)`, clipping against the raster bounds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if `data` is not exactly one tile
    /// long.
    pub fn place(
        &self,
        canvas: &mut Raster,
        tile_x: u32,
        tile_y: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let t = self.tile_size;
        if data.len() != self.tile_bytes() {
            return Err(StoreError::invalid_input(format!(
                "tile data size mismatch: expected {} bytes, got {}",
                self.tile_bytes(),
                data.len()
            )));
        }

        let x0 = tile_x as usize * t;
        let y0 = tile_y as usize * t;
        let width = canvas.width as usize;
        let height = canvas.height as usize;

        let copy_w = width.saturating_sub(x0).min(t);
        let copy_h = height.saturating_sub(y0).min(t);

        for row in 0..copy_h {
            let src = row * t * 3;
            let dst = ((y0 + row) * width + x0) * 3;
            canvas.data[dst..dst + copy_w * 3].copy_from_slice(&data[src..src + copy_w * 3]);
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
