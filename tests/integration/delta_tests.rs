//! Delta encoding tests: election policy, exact retrieval through deltas,
//! and behavior with the delta path disabled.

use tilestore::store::StorageType;

use super::test_utils::{decode_png, encode_png_with, open_store, open_store_at};

/// Tile size used throughout: large enough that a near-identical tile's
/// compressed delta comfortably beats the 25%-savings bar.
const T: usize = 16;

fn base_png() -> Vec<u8> {
    encode_png_with(16, 16, |_, _| (100, 100, 100))
}

fn shifted_png() -> Vec<u8> {
    // +1 in the red channel of every pixel: tiny feature and pixel distance
    encode_png_with(16, 16, |_, _| (101, 100, 100))
}

#[test]
fn test_near_duplicate_tile_stored_as_delta() {
    let (store, _dir) = open_store(T, true);

    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();

    let manifest = store.manifest("shifted").unwrap();
    assert_eq!(manifest.tile_refs.len(), 1);
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Delta);

    // Only the base tile exists physically
    let stats = store.storage_stats().unwrap();
    assert_eq!(stats.unique_tiles, 1);
    assert_eq!(stats.total_tiles, 2);
    assert_eq!(stats.direct_tiles, 1);
    assert_eq!(stats.deduplicated_tiles, 1);
}

#[test]
fn test_delta_retrieval_is_pixel_exact() {
    let (store, _dir) = open_store(T, true);

    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();

    let (width, height, pixels) = decode_png(&store.retrieve_image("shifted").unwrap());
    assert_eq!((width, height), (16, 16));
    assert!(pixels.chunks_exact(3).all(|px| px == [101, 100, 100]));
}

#[test]
fn test_delta_disabled_stores_directly() {
    let (store, _dir) = open_store(T, false);

    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();

    let manifest = store.manifest("shifted").unwrap();
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Unique);
    assert_eq!(store.storage_stats().unwrap().unique_tiles, 2);
}

#[test]
fn test_dissimilar_tile_not_delta_encoded() {
    let (store, _dir) = open_store(T, true);

    store.store_image("black", &encode_png_with(16, 16, |_, _| (0, 0, 0))).unwrap();
    store
        .store_image("white", &encode_png_with(16, 16, |_, _| (255, 255, 255)))
        .unwrap();

    let manifest = store.manifest("white").unwrap();
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Unique);
}

#[test]
fn test_exact_duplicate_beats_delta_path() {
    // An identical image dedups by hash even with deltas enabled
    let (store, _dir) = open_store(T, true);

    store.store_image("a", &base_png()).unwrap();
    store.store_image("b", &base_png()).unwrap();

    let manifest = store.manifest("b").unwrap();
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Duplicate);
    assert_eq!(store.storage_stats().unwrap().unique_tiles, 1);
}

#[test]
fn test_delta_within_single_image() {
    // Two tiles in one image: the second differs from the first by +1 red,
    // so it can delta against a base staged in the same batch
    let (store, _dir) = open_store(T, true);
    let png = encode_png_with(32, 16, |x, _| if x < 16 { (100, 100, 100) } else { (101, 100, 100) });

    store.store_image("pair", &png).unwrap();

    let manifest = store.manifest("pair").unwrap();
    assert_eq!(manifest.tile_refs.len(), 2);
    assert_eq!(manifest.tile_refs[0].storage_type, StorageType::Unique);
    assert_eq!(manifest.tile_refs[1].storage_type, StorageType::Delta);

    let (_, _, pixels) = decode_png(&store.retrieve_image("pair").unwrap());
    for (i, px) in pixels.chunks_exact(3).enumerate() {
        let x = i % 32;
        let expected = if x < 16 { [100, 100, 100] } else { [101, 100, 100] };
        assert_eq!(px, expected, "pixel {i}");
    }
}

#[test]
fn test_delta_survives_reopen() {
    let (store, dir) = open_store(T, true);
    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();
    store.close().unwrap();

    let store = open_store_at(&dir, T, true);
    let (_, _, pixels) = decode_png(&store.retrieve_image("shifted").unwrap());
    assert!(pixels.chunks_exact(3).all(|px| px == [101, 100, 100]));
}

#[test]
fn test_delta_image_survives_base_image_deletion() {
    // Deleting the base image removes only its manifest; the physical base
    // tile remains, so the delta image still resolves
    let (store, _dir) = open_store(T, true);
    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();

    store.delete_image("base").unwrap();

    let (_, _, pixels) = decode_png(&store.retrieve_image("shifted").unwrap());
    assert!(pixels.chunks_exact(3).all(|px| px == [101, 100, 100]));
}

#[test]
fn test_debug_image_marks_delta_tiles_yellow() {
    let (store, _dir) = open_store(T, true);
    store.store_image("base", &base_png()).unwrap();
    store.store_image("shifted", &shifted_png()).unwrap();

    let (_, _, pixels) = decode_png(&store.retrieve_debug_image("shifted").unwrap());
    // Interior pixel of the single (delta) tile
    let i = (8 * 16 + 8) * 3;
    assert_eq!(&pixels[i..i + 3], &[255, 255, 0]);
}
