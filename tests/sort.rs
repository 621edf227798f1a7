//! Transparency sort integration: sorting and rebuilding indices for a
//! voxel list produced by the real mesher, rather than the hand-built
//! `Voxel` fixtures the in-module unit tests use.

use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;

use bloksel_world::index::GlobalIndex;
use bloksel_world::mesher::mesh_chunk;
use bloksel_world::prelude::*;
use bloksel_world::sort::{rebuild_indices, sort_transparent_voxels, SortState};

const EDGE: i32 = 6;

#[test]
fn sorting_a_real_transparent_mesh_keeps_every_voxels_quads_intact() {
    let mut registry = BlockRegistry::new();
    let glass = registry.register(BlockProperties { transparent: true, collidable: false, textures: FaceTextures::Uniform(5) });

    let idx = GlobalIndex::new(0, 0, 0);
    let container = ChunkContainer::new(EDGE);
    let mut composition = BlockArrayBox::unallocated(EDGE, BlockType::AIR);
    // A sparse scatter of floating glass blocks, each isolated so every
    // face is emitted and none get merged away.
    let placements = [(1, 1, 1), (3, 1, 1), (1, 3, 1), (1, 1, 4)];
    for &(i, j, k) in &placements {
        composition.set(BlockIndex::new(i, j, k), glass);
    }
    let mut chunk = Chunk::new_empty(idx, EDGE, 15);
    chunk.set_composition(composition, &registry);
    container.insert(idx, Arc::new(RwLock::new(chunk)));

    let handle = container.get(idx).unwrap();
    let guard = handle.read();
    let (_opaque, transparent) = mesh_chunk(&container, &guard, &registry);
    assert_eq!(transparent.voxels.len(), placements.len());

    let mut voxels = transparent.voxels.clone();
    let mut state = SortState::default();
    let view = Vec3::new(-5.0, -5.0, -5.0);
    let changed = sort_transparent_voxels(&mut voxels, &mut state, idx, idx, view, 1.0, EDGE);
    assert!(changed);

    let indices = rebuild_indices(&voxels, Vec3::ZERO, view, 1.0);
    // Each floating voxel shows all six faces, so the rebuilt index buffer
    // should carry exactly six quads' worth of indices per voxel.
    assert_eq!(indices.len(), voxels.len() * 6 * 6);
}
