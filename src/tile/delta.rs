//! Per-sample delta codec for near-duplicate tiles.
//!
//! A delta is the signed byte-wise difference between a new tile and a base
//! tile, clamped to `[-128, 127]`, then gzip-compressed. The wire format is a
//! 4-byte little-endian uncompressed-length header followed by the gzip
//! stream.
//!
//! Because the difference is clamped, encode-then-apply is only an identity
//! when every sample difference fits in `[-128, 127]`; the store verifies
//! this before electing delta storage.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::StoreError;

/// Byte length of the uncompressed-length header.
const LENGTH_HEADER: usize = 4;

/// Encode the clamped per-sample difference `new - base` as a compressed
/// delta.
///
/// Both inputs must be exactly `tile_size * tile_size * 3` bytes.
pub fn encode_delta(new: &[u8], base: &[u8], tile_size: usize) -> Result<Vec<u8>, StoreError> {
    if new.len() != base.len() {
        return Err(StoreError::invalid_input(format!(
            "tile sizes don't match: {} vs {}",
            new.len(),
            base.len()
        )));
    }
    let expected = tile_size * tile_size * 3;
    if new.len() != expected {
        return Err(StoreError::invalid_input(format!(
            "invalid tile size: expected {expected}, got {}",
            new.len()
        )));
    }

    let mut delta = vec![0u8; new.len()];
    for (d, (&n, &b)) in delta.iter_mut().zip(new.iter().zip(base.iter())) {
        let diff = (n as i16 - b as i16).clamp(-128, 127) as i8;
        *d = diff as u8;
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&delta)
        .map_err(|e| StoreError::compression(format!("failed to compress delta: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StoreError::compression(format!("failed to compress delta: {e}")))?;

    let mut out = Vec::with_capacity(LENGTH_HEADER + compressed.len());
    out.extend_from_slice(&(delta.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Reconstruct a tile by applying a compressed delta to its base tile, with
/// saturating arithmetic.
pub fn apply_delta(base: &[u8], delta: &[u8], tile_size: usize) -> Result<Vec<u8>, StoreError> {
    let expected = tile_size * tile_size * 3;
    if base.len() != expected {
        return Err(StoreError::invalid_input(format!(
            "invalid base tile size: expected {expected}, got {}",
            base.len()
        )));
    }

    let samples = decompress_delta(delta)?;
    if samples.len() != expected {
        return Err(StoreError::corrupt(format!(
            "delta size mismatch: expected {expected}, got {}",
            samples.len()
        )));
    }

    let mut out = vec![0u8; expected];
    for (o, (&b, &d)) in out.iter_mut().zip(base.iter().zip(samples.iter())) {
        *o = (b as i16 + d as i8 as i16).clamp(0, 255) as u8;
    }
    Ok(out)
}

/// Compressed size a delta between the two tiles would occupy.
///
/// Same as running [`encode_delta`] and taking the length.
pub fn estimate_delta_size(new: &[u8], base: &[u8], tile_size: usize) -> Result<usize, StoreError> {
    Ok(encode_delta(new, base, tile_size)?.len())
}

/// Perceptual pixel distance between two equal-sized tiles, normalized to
/// `[0, 1]`.
///
/// `sqrt(sum((a_i - b_i)^2) / (pixels * 3 * 255^2))`: 0 for identical tiles,
/// 1 for maximally different ones.
pub fn pixel_distance(a: &[u8], b: &[u8], tile_size: usize) -> Result<f64, StoreError> {
    if a.len() != b.len() {
        return Err(StoreError::invalid_input(format!(
            "tile sizes don't match: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let expected = tile_size * tile_size * 3;
    if a.len() != expected {
        return Err(StoreError::invalid_input(format!(
            "invalid tile size: expected {expected}, got {}",
            a.len()
        )));
    }

    let mut sum_sq = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let diff = x as f64 - y as f64;
        sum_sq += diff * diff;
    }

    let pixels = (tile_size * tile_size) as f64;
    let max_sq = 255.0 * 255.0 * 3.0;
    Ok((sum_sq / (pixels * max_sq)).sqrt())
}

fn decompress_delta(delta: &[u8]) -> Result<Vec<u8>, StoreError> {
    if delta.len() < LENGTH_HEADER {
        return Err(StoreError::corrupt(
            "delta shorter than its length header".to_string(),
        ));
    }

    let mut header = [0u8; LENGTH_HEADER];
    header.copy_from_slice(&delta[..LENGTH_HEADER]);
    let declared = u32::from_le_bytes(header) as usize;

    let mut samples = Vec::with_capacity(declared);
    GzDecoder::new(&delta[LENGTH_HEADER..])
        .read_to_end(&mut samples)
        .map_err(|e| StoreError::compression(format!("failed to decompress delta: {e}")))?;

    if samples.len() != declared {
        return Err(StoreError::corrupt(format!(
            "decompressed size mismatch: expected {declared}, got {}",
            samples.len()
        )));
    }

    Ok(samples)
}

// =============================================================================
// Tests
// =============================================================================
