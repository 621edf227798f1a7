//! Cross-chunk container integration: boundary bookkeeping and the
//! multi-region gather feeding off several real, populated neighbors at
//! once (the in-module unit tests only ever populate one chunk at a time).

use std::sync::Arc;

use parking_lot::RwLock;

use bloksel_world::prelude::*;

const EDGE: i32 = 4;

fn stone_registry() -> (BlockRegistry, BlockType) {
    let mut registry = BlockRegistry::new();
    let stone = registry.register(BlockProperties {
        transparent: false,
        collidable: true,
        textures: FaceTextures::Uniform(1),
    });
    (registry, stone)
}

fn solid_chunk(idx: GlobalIndex, stone: BlockType, registry: &BlockRegistry) -> ChunkHandle {
    let mut chunk = Chunk::new_empty(idx, EDGE, 15);
    let values = vec![stone; (EDGE * EDGE * EDGE) as usize];
    chunk.set_composition(BlockArrayBox::allocated(EDGE, BlockType::AIR, values), registry);
    Arc::new(RwLock::new(chunk))
}

#[test]
fn retrieve_type_data_straddles_three_loaded_neighbors() {
    let (registry, stone) = stone_registry();
    let container = ChunkContainer::new(EDGE);

    let center = GlobalIndex::new(0, 0, 0);
    let east = GlobalIndex::new(1, 0, 0);
    container.insert(center, solid_chunk(center, stone, &registry));
    container.insert(east, solid_chunk(east, stone, &registry));
    // West neighbor stays absent; the gather must fall back to Air there.

    let center_handle = container.get(center).unwrap();
    let center_guard = center_handle.read();

    let halo = [BlockBox::new((-1, -1, -1), (EDGE + 1, EDGE + 1, EDGE + 1))];
    let (gathered, min) = container.retrieve_type_data(&center_guard, &halo);

    // The East neighbor's first column (global i = EDGE) must read as stone.
    let east_local = BlockIndex::new((EDGE - min.0) as i32, (1 - min.1) as i32, (1 - min.2) as i32);
    assert_eq!(gathered.get(east_local), stone);

    // The West neighbor is unloaded; its halo column reads Air (§9 decision).
    let west_local = BlockIndex::new((-1 - min.0) as i32, (1 - min.1) as i32, (1 - min.2) as i32);
    assert_eq!(gathered.get(west_local), BlockType::AIR);
}

fn empty_chunk(idx: GlobalIndex) -> ChunkHandle {
    Arc::new(RwLock::new(Chunk::new_empty(idx, EDGE, 15)))
}

#[test]
fn boundary_set_tracks_insertion_and_removal_across_many_chunks() {
    let container = ChunkContainer::new(EDGE);
    let origin = GlobalIndex::new(0, 0, 0);

    container.insert(origin, empty_chunk(origin));
    let loadable = container.find_all_loadable_indices(origin, 1);
    assert!(loadable.contains(&GlobalIndex::new(1, 0, 0)));
    assert!(!loadable.contains(&origin), "a present chunk is never its own boundary");

    // Filling in every cardinal neighbor (still unloaded-composition, so
    // every face stays non-opaque) should push the boundary outward to the
    // second ring rather than leaving it on the now-interior first ring.
    for n in origin.cardinal_neighbors() {
        container.insert(n, empty_chunk(n));
    }
    assert!(!container.is_on_boundary(GlobalIndex::new(1, 0, 0)));
    assert!(container.is_on_boundary(GlobalIndex::new(2, 0, 0)));

    container.erase(GlobalIndex::new(1, 0, 0));
    assert!(container.is_on_boundary(GlobalIndex::new(1, 0, 0)));
}
