//! Debug visualization of a stored image's tile provenance.
//!
//! Renders a raster the size of the original image where each tile region is
//! filled with a color describing how that tile was stored, outlined by a
//! one-pixel black border:
//!
//! - green: unique (first physical copy)
//! - blue: exact duplicate of an existing tile
//! - yellow: delta-encoded against a base tile
//! - red: unrecognized provenance tag

use crate::codec::Raster;

use super::manifest::{StorageType, StoredImage};

const COLOR_UNIQUE: [u8; 3] = [0, 255, 0];
const COLOR_DUPLICATE: [u8; 3] = [0, 0, 255];
const COLOR_DELTA: [u8; 3] = [255, 255, 0];
const COLOR_UNKNOWN: [u8; 3] = [255, 0, 0];
const COLOR_BORDER: [u8; 3] = [0, 0, 0];

fn storage_color(storage_type: StorageType) -> [u8; 3] {
    match storage_type {
        StorageType::Unique => COLOR_UNIQUE,
        StorageType::Duplicate => COLOR_DUPLICATE,
        StorageType::Delta => COLOR_DELTA,
        StorageType::Unknown => COLOR_UNKNOWN,
    }
}

/// Render the per-tile storage map for a manifest.
pub fn render_storage_map(manifest: &StoredImage, tile_size: usize) -> Raster {
    let mut canvas = Raster::blank(manifest.width, manifest.height);
    let width = manifest.width as usize;
    let height = manifest.height as usize;

    for tile_ref in &manifest.tile_refs {
        let color = storage_color(tile_ref.storage_type);

        let x0 = tile_ref.tile_x as usize * tile_size;
        let y0 = tile_ref.tile_y as usize * tile_size;
        let x1 = (x0 + tile_size).min(width);
        let y1 = (y0 + tile_size).min(height);

        for y in y0..y1 {
            for x in x0..x1 {
                let on_border = x == x0 || x == x1 - 1 || y == y0 || y == y1 - 1;
                let px = if on_border { COLOR_BORDER } else { color };
                let i = (y * width + x) * 3;
                canvas.data[i..i + 3].copy_from_slice(&px);
            }
        }
    }

    canvas
}

// =============================================================================
// Tests
// =============================================================================
