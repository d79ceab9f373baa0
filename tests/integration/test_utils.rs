//! Shared helpers for integration tests.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use tempfile::TempDir;

use tilestore::store::{ImageStore, StoreOptions};

/// Open a store backed by a temporary directory.
///
/// The returned `TempDir` must be kept alive for the store's lifetime.
pub fn open_store(tile_size: usize, enable_delta_tiles: bool) -> (ImageStore, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = open_store_at(&dir, tile_size, enable_delta_tiles);
    (store, dir)
}

/// Open a store against an existing temporary directory (for reopen tests).
pub fn open_store_at(dir: &TempDir, tile_size: usize, enable_delta_tiles: bool) -> ImageStore {
    let options = StoreOptions {
        tile_size,
        db_path: dir.path().join("imagestore.db"),
        enable_delta_tiles,
        ..Default::default()
    };
    ImageStore::open(options).expect("failed to open store")
}

/// Render a PNG from a per-pixel color function.
pub fn encode_png_with<F>(width: u32, height: u32, pixel: F) -> Vec<u8>
where
    F: Fn(u32, u32) -> (u8, u8, u8),
{
    let img = RgbImage::from_fn(width, height, |x, y| {
        let (r, g, b) = pixel(x, y);
        image::Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("failed to encode test PNG");
    buf
}

/// Decode a PNG into `(width, height, rgb_bytes)`.
pub fn decode_png(data: &[u8]) -> (u32, u32, Vec<u8>) {
    let img = image::load_from_memory(data)
        .expect("failed to decode PNG")
        .to_rgb8();
    let (width, height) = img.dimensions();
    (width, height, img.into_raw())
}

/// Deterministic test pattern with distinct tiles.
pub fn test_pattern(x: u32, y: u32) -> (u8, u8, u8) {
    let x = x as i64;
    let y = y as i64;
    (
        (((x + y) * 32).rem_euclid(256)) as u8,
        ((x * y).rem_euclid(256)) as u8,
        (((x - y + 8) * 32).rem_euclid(256)) as u8,
    )
}

/// RGB bytes the pattern produces for a full raster, for comparison against
/// retrieved images.
pub fn pattern_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = test_pattern(x, y);
            data.extend_from_slice(&[r, g, b]);
        }
    }
    data
}

/// Build a multipart/form-data request body with a single file field.
///
/// Returns `(content_type_header_value, body)`.
pub fn multipart_body(field: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "tilestore-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
