//! Tile feature extraction and feature distance.
//!
//! A tile is summarized as a fixed-length feature vector: a quantized 4×4×4
//! color histogram, per-channel means, mean brightness, and contrast. The
//! vector is cheap to compare, so it prunes the candidate set before any
//! pixel-level comparison happens.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::tile::TileId;

/// Number of histogram bins (4 levels per RGB channel).
pub const HISTOGRAM_BINS: usize = 64;

/// Weight of the histogram term in the feature distance.
const WEIGHT_HISTOGRAM: f64 = 0.4;

/// Weight of the mean-color term in the feature distance.
const WEIGHT_COLOR: f64 = 0.4;

/// Weight of the brightness term in the feature distance.
const WEIGHT_BRIGHTNESS: f64 = 0.1;

/// Weight of the contrast term in the feature distance.
const WEIGHT_CONTRAST: f64 = 0.1;

// =============================================================================
// Tile Features
// =============================================================================

/// Feature vector summarizing one tile.
///
/// Derived deterministically from tile bytes. Serialized field names follow
/// the persisted-JSON contract of the `features:` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileFeatures {
    /// ID of the tile these features describe
    #[serde(rename = "TileID")]
    pub tile_id: TileId,

    /// Normalized 4×4×4 RGB histogram, 64 bins summing to 1
    #[serde(rename = "ColorHistogram")]
    pub color_histogram: Vec<f64>,

    /// Mean of per-pixel brightness `(R+G+B)/3`, in `[0, 255]`
    #[serde(rename = "AvgBrightness")]
    pub avg_brightness: f64,

    /// Mean red sample, in `[0, 255]`
    #[serde(rename = "AvgRed")]
    pub avg_red: f64,

    /// Mean green sample, in `[0, 255]`
    #[serde(rename = "AvgGreen")]
    pub avg_green: f64,

    /// Mean blue sample, in `[0, 255]`
    #[serde(rename = "AvgBlue")]
    pub avg_blue: f64,

    /// Brightness range `max - min`, in `[0, 255]`
    #[serde(rename = "Contrast")]
    pub contrast: f64,
}

/// Extract the feature vector for a tile.
///
/// # Errors
///
/// Returns [`StoreError::InvalidInput`] if `data` is not exactly
/// `tile_size * tile_size * 3` bytes.
pub fn extract_features(
    tile_id: TileId,
    data: &[u8],
    tile_size: usize,
) -> Result<TileFeatures, StoreError> {
    let expected = tile_size * tile_size * 3;
    if data.len() != expected {
        return Err(StoreError::invalid_input(format!(
            "invalid tile data size: expected {expected}, got {}",
            data.len()
        )));
    }

    let pixels = tile_size * tile_size;
    let mut histogram = [0u32; HISTOGRAM_BINS];
    let mut total_r = 0.0f64;
    let mut total_g = 0.0f64;
    let mut total_b = 0.0f64;
    // Initialized so a single-color tile yields contrast 0
    let mut min_brightness = 255.0f64;
    let mut max_brightness = 0.0f64;

    for px in data.chunks_exact(3) {
        let (r, g, b) = (px[0], px[1], px[2]);
        total_r += r as f64;
        total_g += g as f64;
        total_b += b as f64;

        let brightness = (r as f64 + g as f64 + b as f64) / 3.0;
        min_brightness = min_brightness.min(brightness);
        max_brightness = max_brightness.max(brightness);

        // Quantize each channel to 2 bits; the top bin saturates
        let r_bin = (r >> 6).min(3) as usize;
        let g_bin = (g >> 6).min(3) as usize;
        let b_bin = (b >> 6).min(3) as usize;
        histogram[r_bin * 16 + g_bin * 4 + b_bin] += 1;
    }

    let n = pixels as f64;
    Ok(TileFeatures {
        tile_id,
        color_histogram: histogram.iter().map(|&c| c as f64 / n).collect(),
        avg_brightness: (total_r + total_g + total_b) / (3.0 * n),
        avg_red: total_r / n,
        avg_green: total_g / n,
        avg_blue: total_b / n,
        contrast: (max_brightness - min_brightness).max(0.0),
    })
}

/// Weighted distance between two feature vectors.
///
/// Combines a χ²/2 histogram distance, the RMS distance between normalized
/// channel means, and absolute brightness and contrast differences:
/// `0.4·H + 0.4·C + 0.1·B + 0.1·K`. Non-negative, zero for identical
/// features, unitless.
pub fn feature_distance(a: &TileFeatures, b: &TileFeatures) -> f64 {
    // Histogram term: chi-squared / 2, skipping bins empty on both sides
    let mut hist = 0.0;
    for (&x, &y) in a.color_histogram.iter().zip(b.color_histogram.iter()) {
        let sum = x + y;
        if sum > 0.0 {
            let diff = x - y;
            hist += diff * diff / sum;
        }
    }
    hist *= 0.5;

    let dr = (a.avg_red - b.avg_red) / 255.0;
    let dg = (a.avg_green - b.avg_green) / 255.0;
    let db = (a.avg_blue - b.avg_blue) / 255.0;
    let color = (dr * dr + dg * dg + db * db).sqrt();

    let brightness = ((a.avg_brightness - b.avg_brightness) / 255.0).abs();
    let contrast = ((a.contrast - b.contrast) / 255.0).abs();

    WEIGHT_HISTOGRAM * hist
        + WEIGHT_COLOR * color
        + WEIGHT_BRIGHTNESS * brightness
        + WEIGHT_CONTRAST * contrast
}

// =============================================================================
// Tests
// =============================================================================
