//! Image codec boundary.
//!
//! The store operates on a canonical in-memory raster: width × height pixels
//! of 8-bit RGB samples in row-major order. Everything crossing the store's
//! public API is an encoded image (PNG or JPEG on the way in, PNG on the way
//! out); this module is the only place that talks to the `image` crate.
//!
//! Retrieval always encodes PNG so that the decoded raster survives the
//! encode/decode round trip byte-for-byte.

use std::io::Cursor;

use image::{ImageFormat, ImageReader, RgbImage};

use crate::error::StoreError;

// =============================================================================
// Raster
// =============================================================================

/// A decoded image: 8-bit RGB samples in row-major order.
///
/// `data.len()` is always `width * height * 3`. Sample order within a pixel
/// is R, G, B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Raw RGB samples, `width * height * 3` bytes
    pub data: Vec<u8>,
}

impl Raster {
    /// Create a raster from raw RGB bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if `data` is not exactly
    /// `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self, StoreError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(StoreError::invalid_input(format!(
                "raster data size mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create an all-black raster of the given dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }
}

// =============================================================================
// Decode / Encode
// =============================================================================

/// Decode an encoded image (PNG, JPEG, or any format the `image` crate
/// auto-detects) into a canonical RGB raster.
///
/// Alpha channels are dropped; grayscale is expanded to RGB.
pub fn decode_raster(data: &[u8]) -> Result<Raster, StoreError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| StoreError::codec(format!("failed to sniff image format: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| StoreError::codec(format!("failed to decode image: {e}")))?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(Raster {
        width,
        height,
        data: rgb.into_raw(),
    })
}

/// Encode a raster as PNG.
///
/// PNG is lossless for 8-bit RGB, so decoding the returned bytes reproduces
/// the input raster exactly.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, StoreError> {
    let img = RgbImage::from_raw(raster.width, raster.height, raster.data.clone()).ok_or_else(
        || {
            StoreError::codec(format!(
                "raster buffer does not match {}x{} dimensions",
                raster.width, raster.height
            ))
        },
    )?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| StoreError::codec(format!("failed to encode PNG: {e}")))?;

    Ok(buf)
}

// =============================================================================
// Tests
// =============================================================================
