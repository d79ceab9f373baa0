//! End-to-end store tests: store, retrieve, dedup, delete, list, stats,
//! and persistence across reopen.

use tilestore::error::StoreError;
use tilestore::store::StorageType;
use tilestore::tile::tile_id;

use super::test_utils::{
    decode_png, encode_png_with, open_store, open_store_at, pattern_bytes, test_pattern,
};

// =============================================================================
// Basic Store / Retrieve
// =============================================================================

#[test]
fn test_store_single_image_all_tiles_unique() {
    // 8x8 deterministic pattern with 4px tiles: four distinct tiles
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 8, test_pattern);

    store.store_image("pattern", &png).unwrap();

    let manifest = store.manifest("pattern").unwrap();
    assert_eq!(manifest.width, 8);
    assert_eq!(manifest.height, 8);
    assert_eq!(manifest.tile_refs.len(), 4);
    assert!(manifest
        .tile_refs
        .iter()
        .all(|r| r.storage_type == StorageType::Unique));
    assert_eq!(manifest.original_bytes, png.len() as u64);

    let stats = store.storage_stats().unwrap();
    assert_eq!(stats.total_images, 1);
    assert_eq!(stats.total_tiles, 4);
    assert_eq!(stats.unique_tiles, 4);
    assert_eq!(stats.direct_tiles, 4);
    assert_eq!(stats.deduplicated_tiles, 0);
}

#[test]
fn test_retrieval_is_pixel_exact() {
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 8, test_pattern);

    store.store_image("pattern", &png).unwrap();
    let retrieved = store.retrieve_image("pattern").unwrap();

    let (width, height, pixels) = decode_png(&retrieved);
    assert_eq!((width, height), (8, 8));
    assert_eq!(pixels, pattern_bytes(8, 8));
}

#[test]
fn test_retrieval_discards_tile_padding() {
    // 10x7 with 4px tiles: right and bottom tiles are padded
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(10, 7, test_pattern);

    store.store_image("odd", &png).unwrap();
    let manifest = store.manifest("odd").unwrap();
    assert_eq!(manifest.tile_refs.len(), 3 * 2);

    let (width, height, pixels) = decode_png(&store.retrieve_image("odd").unwrap());
    assert_eq!((width, height), (10, 7));
    assert_eq!(pixels, pattern_bytes(10, 7));
}

#[test]
fn test_padded_tile_id_is_hash_of_padded_bytes() {
    // 3x3 with 4px tiles: one tile, columns/rows past the raster are zero
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(3, 3, test_pattern);

    store.store_image("tiny", &png).unwrap();
    let manifest = store.manifest("tiny").unwrap();
    assert_eq!(manifest.tile_refs.len(), 1);

    // Build the expected 48-byte zero-padded tile by hand
    let mut expected = vec![0u8; 4 * 4 * 3];
    for y in 0..3u32 {
        for x in 0..3u32 {
            let (r, g, b) = test_pattern(x, y);
            let i = (y as usize * 4 + x as usize) * 3;
            expected[i] = r;
            expected[i + 1] = g;
            expected[i + 2] = b;
        }
    }

    let expected_id = tile_id(&expected);
    assert_eq!(manifest.tile_refs[0].tile_id, expected_id);
    assert_eq!(expected_id.len(), 64);
}

// =============================================================================
// Deduplication
// =============================================================================

#[test]
fn test_storing_identical_image_twice_dedups_all_tiles() {
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 8, test_pattern);

    store.store_image("a", &png).unwrap();
    let before = store.storage_stats().unwrap();

    store.store_image("b", &png).unwrap();
    let after = store.storage_stats().unwrap();

    assert_eq!(after.unique_tiles, before.unique_tiles);
    assert_eq!(after.total_images, 2);

    let manifest = store.manifest("b").unwrap();
    assert!(manifest
        .tile_refs
        .iter()
        .all(|r| r.storage_type == StorageType::Duplicate));

    // The duplicate image still retrieves exactly
    let (_, _, pixels) = decode_png(&store.retrieve_image("b").unwrap());
    assert_eq!(pixels, pattern_bytes(8, 8));
}

#[test]
fn test_within_image_duplicates_resolve_to_first_occurrence() {
    // Uniform 8x4 image with 4px tiles: both tiles have identical bytes
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 4, |_, _| (42, 42, 42));

    store.store_image("uniform", &png).unwrap();

    let manifest = store.manifest("uniform").unwrap();
    assert_eq!(manifest.tile_refs.len(), 2);
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Unique);
    assert_eq!(manifest.tile_refs[1].storage_type, StorageType::Duplicate);
    assert_eq!(manifest.tile_refs[0].tile_id, manifest.tile_refs[1].tile_id);

    let stats = store.storage_stats().unwrap();
    assert_eq!(stats.unique_tiles, 1);
    assert_eq!(stats.total_tiles, 2);
}

#[test]
fn test_stats_percentages_and_ratio() {
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 4, |_, _| (42, 42, 42));

    store.store_image("uniform", &png).unwrap();
    let stats = store.storage_stats().unwrap();

    assert!((stats.direct_percent - 50.0).abs() < 1e-9);
    assert!((stats.deduplicated_percent - 50.0).abs() < 1e-9);
    assert!(stats.storage_bytes > 0);
    assert_eq!(stats.original_bytes, png.len() as u64);
    let expected_ratio = stats.original_bytes as f64 / stats.storage_bytes as f64;
    assert!((stats.compression_ratio - expected_ratio).abs() < 1e-9);
}

// =============================================================================
// Missing Images / Delete
// =============================================================================

#[test]
fn test_retrieve_missing_image_is_not_found() {
    let (store, _dir) = open_store(4, false);

    let result = store.retrieve_image("nope");
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[test]
fn test_delete_removes_manifest_but_keeps_tiles() {
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(8, 8, test_pattern);

    store.store_image("x", &png).unwrap();
    let before = store.storage_stats().unwrap();

    store.delete_image("x").unwrap();

    let result = store.retrieve_image("x");
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
    assert!(!store.list_images().unwrap().contains(&"x".to_string()));

    // Tiles are retained after manifest deletion
    let after = store.storage_stats().unwrap();
    assert_eq!(after.unique_tiles, before.unique_tiles);
    assert_eq!(after.total_images, 0);
}

#[test]
fn test_delete_missing_image_is_not_found() {
    let (store, _dir) = open_store(4, false);

    let result = store.delete_image("nope");
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_list_images_sorted_ascending() {
    let (store, _dir) = open_store(4, false);
    let png = encode_png_with(4, 4, test_pattern);

    store.store_image("charlie", &png).unwrap();
    store.store_image("alpha", &png).unwrap();
    store.store_image("bravo", &png).unwrap();

    assert_eq!(
        store.list_images().unwrap(),
        vec!["alpha", "bravo", "charlie"]
    );
}

#[test]
fn test_list_images_empty_store() {
    let (store, _dir) = open_store(4, false);
    assert!(store.list_images().unwrap().is_empty());
}

// =============================================================================
// Overwrite / Reopen
// =============================================================================

#[test]
fn test_storing_same_id_replaces_manifest() {
    let (store, _dir) = open_store(4, false);

    store
        .store_image("img", &encode_png_with(8, 8, test_pattern))
        .unwrap();
    store
        .store_image("img", &encode_png_with(4, 4, |_, _| (1, 2, 3)))
        .unwrap();

    let manifest = store.manifest("img").unwrap();
    assert_eq!((manifest.width, manifest.height), (4, 4));
    assert_eq!(store.storage_stats().unwrap().total_images, 1);
}

#[test]
fn test_reopen_preserves_images_and_dedup() {
    let (store, dir) = open_store(4, false);
    let png = encode_png_with(8, 8, test_pattern);
    store.store_image("persisted", &png).unwrap();
    store.close().unwrap();

    let store = open_store_at(&dir, 4, false);

    // Retrieval works from cold state
    let (_, _, pixels) = decode_png(&store.retrieve_image("persisted").unwrap());
    assert_eq!(pixels, pattern_bytes(8, 8));

    // Dedup still works against tiles stored before the reopen
    store.store_image("again", &png).unwrap();
    let manifest = store.manifest("again").unwrap();
    assert!(manifest
        .tile_refs
        .iter()
        .all(|r| r.storage_type == StorageType::Duplicate));
}

// =============================================================================
// Debug Visualization
// =============================================================================

#[test]
fn test_debug_image_has_image_dimensions() {
    let (store, _dir) = open_store(4, false);
    store
        .store_image("dbg", &encode_png_with(8, 8, test_pattern))
        .unwrap();

    let (width, height, pixels) = decode_png(&store.retrieve_debug_image("dbg").unwrap());
    assert_eq!((width, height), (8, 8));

    // All tiles are unique: interior pixels are green
    let interior = |x: usize, y: usize| {
        let i = (y * 8 + x) * 3;
        [pixels[i], pixels[i + 1], pixels[i + 2]]
    };
    assert_eq!(interior(1, 1), [0, 255, 0]);
    assert_eq!(interior(5, 5), [0, 255, 0]);
    // Tile borders are black
    assert_eq!(interior(0, 0), [0, 0, 0]);
}
