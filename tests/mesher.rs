//! Mesher integration: meshing a chunk whose composition comes from the
//! real terrain fill, through a populated container, checking the shared
//! face between two adjacent solid chunks is correctly suppressed.

use std::sync::Arc;

use parking_lot::RwLock;

use bloksel_world::index::GlobalIndex;
use bloksel_world::mesher::mesh_chunk;
use bloksel_world::prelude::*;
use bloksel_world::terrain::{LayeredClassifier, TerrainGenerator};

const EDGE: i32 = 8;

fn registry() -> (BlockRegistry, BlockType, BlockType, BlockType) {
    let mut r = BlockRegistry::new();
    let stone = r.register(BlockProperties { transparent: false, collidable: true, textures: FaceTextures::Uniform(1) });
    let soil = r.register(BlockProperties { transparent: false, collidable: true, textures: FaceTextures::Uniform(2) });
    let surface = r.register(BlockProperties { transparent: false, collidable: true, textures: FaceTextures::Uniform(3) });
    (r, stone, soil, surface)
}

#[test]
fn flat_world_hides_the_shared_face_between_two_loaded_chunks() {
    let (registry, stone, soil, surface) = registry();
    let classifier = LayeredClassifier { soil_depth: 4.0, surface_depth: 1.0, stone, soil, surface };
    let flat = |_x: f32, _y: f32| 100.0f32;
    let no_biome = |_x: f32, _y: f32| 0u8;
    let generator = TerrainGenerator { elevation: &flat, biomes: &no_biome, classifier: &classifier, edge: EDGE, block_len: 1.0 };

    let container = ChunkContainer::new(EDGE);
    let west = GlobalIndex::new(0, 0, 0);
    let east = GlobalIndex::new(1, 0, 0);

    for idx in [west, east] {
        let mut chunk = Chunk::new_empty(idx, EDGE, 15);
        chunk.set_composition(generator.fill_chunk(idx), &registry);
        container.insert(idx, Arc::new(RwLock::new(chunk)));
    }

    let west_handle = container.get(west).unwrap();
    let west_guard = west_handle.read();
    let (opaque, transparent) = mesh_chunk(&container, &west_guard, &registry);
    assert!(transparent.vertices.is_empty(), "an all-opaque flat world has no transparent output");

    // Every voxel on the East-facing column of the West chunk sits next to
    // an identical (or at worst, equally opaque) block in the East chunk at
    // the same height, so none of those voxels should emit an East quad.
    let east_face_enabled = opaque
        .voxels
        .iter()
        .filter(|v| v.index.i == EDGE - 1)
        .any(|v| v.face_enabled(bloksel_world::index::Direction::East));
    assert!(!east_face_enabled, "the shared boundary between two solid neighbors must not be meshed");
}

#[test]
fn surface_layer_exposes_a_top_face_with_full_sunlight() {
    let (registry, stone, soil, surface) = registry();
    let classifier = LayeredClassifier { soil_depth: 4.0, surface_depth: 1.0, stone, soil, surface };
    let flat = |_x: f32, _y: f32| 4.0f32; // surface sits inside this chunk
    let no_biome = |_x: f32, _y: f32| 0u8;
    let generator = TerrainGenerator { elevation: &flat, biomes: &no_biome, classifier: &classifier, edge: EDGE, block_len: 1.0 };

    let container = ChunkContainer::new(EDGE);
    let idx = GlobalIndex::new(0, 0, 0);
    let mut chunk = Chunk::new_empty(idx, EDGE, 15);
    chunk.set_composition(generator.fill_chunk(idx), &registry);
    container.insert(idx, Arc::new(RwLock::new(chunk)));

    let handle = container.get(idx).unwrap();
    let guard = handle.read();
    let (opaque, _) = mesh_chunk(&container, &guard, &registry);
    assert!(!opaque.vertices.is_empty(), "a partially-filled column must mesh a visible surface");

    // Every emitted vertex's packed sunlight field should read full
    // brightness: the container has no neighbors loaded, so the halo
    // defaults to max_sunlight everywhere above the unloaded boundary.
    let any_lit = opaque.vertices.iter().any(|v| (v.lighting_data >> 16) & 0xF == 15);
    assert!(any_lit, "top faces above an unloaded halo should sample full default sunlight");
}
