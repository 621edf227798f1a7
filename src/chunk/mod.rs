//! The chunk: composition, lighting, and the derived non-opaque face
//! bitmask.

use bitflags::bitflags;

use crate::arrays::BlockArrayBox;
use crate::block::{BlockRegistry, BlockType};
use crate::index::{BlockIndex, Direction, GlobalIndex};

/// Sunlight intensity, `[0, L]` with `L = MAX_SUNLIGHT` (15 by default).
pub type BlockLight = u8;

bitflags! {
    /// Bit `d` set iff chunk's boundary layer on direction `d` contains at
    /// least one transparent voxel (i.e. the chunk is NOT face-opaque on `d`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct NonOpaqueFaces: u8 {
        const WEST   = 1 << 0;
        const EAST   = 1 << 1;
        const SOUTH  = 1 << 2;
        const NORTH  = 1 << 3;
        const BOTTOM = 1 << 4;
        const TOP    = 1 << 5;
    }
}

impl NonOpaqueFaces {
    fn bit_for(d: Direction) -> NonOpaqueFaces {
        match d {
            Direction::West => NonOpaqueFaces::WEST,
            Direction::East => NonOpaqueFaces::EAST,
            Direction::South => NonOpaqueFaces::SOUTH,
            Direction::North => NonOpaqueFaces::NORTH,
            Direction::Bottom => NonOpaqueFaces::BOTTOM,
            Direction::Top => NonOpaqueFaces::TOP,
        }
    }
}

pub struct Chunk {
    index: GlobalIndex,
    composition: BlockArrayBox<BlockType>,
    lighting: BlockArrayBox<BlockLight>,
    non_opaque_faces: NonOpaqueFaces,
    edge: i32,
    max_sunlight: BlockLight,
}

impl Chunk {
    /// A freshly-loaded chunk: unallocated composition (all Air) and
    /// unallocated lighting (maximum sunlight everywhere).
    pub fn new_empty(index: GlobalIndex, edge: i32, max_sunlight: BlockLight) -> Self {
        Self {
            index,
            composition: BlockArrayBox::unallocated(edge, BlockType::AIR),
            lighting: BlockArrayBox::unallocated(edge, max_sunlight),
            non_opaque_faces: NonOpaqueFaces::all(),
            edge,
            max_sunlight,
        }
    }

    pub fn index(&self) -> GlobalIndex {
        self.index
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    pub fn max_sunlight(&self) -> BlockLight {
        self.max_sunlight
    }

    pub fn composition(&self) -> &BlockArrayBox<BlockType> {
        &self.composition
    }

    pub fn lighting(&self) -> &BlockArrayBox<BlockLight> {
        &self.lighting
    }

    pub fn block_at(&self, idx: BlockIndex) -> BlockType {
        self.composition.get(idx)
    }

    pub fn light_at(&self, idx: BlockIndex) -> BlockLight {
        self.lighting.get(idx)
    }

    pub fn is_empty(&self) -> bool {
        !self.composition.is_allocated()
    }

    pub fn non_opaque_faces(&self) -> NonOpaqueFaces {
        self.non_opaque_faces
    }

    pub fn is_face_opaque(&self, d: Direction) -> bool {
        !self.non_opaque_faces.contains(NonOpaqueFaces::bit_for(d))
    }

    /// Overwrites the whole composition array (terrain fill, region load)
    /// and recomputes the derived face-opacity cache. The cache is
    /// recomputed only on composition mutation, never read stale.
    pub fn set_composition(&mut self, mut composition: BlockArrayBox<BlockType>, registry: &BlockRegistry) {
        composition.compact();
        self.non_opaque_faces = recompute_non_opaque_faces(&composition, registry);
        self.composition = composition;
    }

    /// Places or removes a single voxel, recomputing the face-opacity cache
    /// if the voxel lies on a chunk boundary.
    pub fn set_block(&mut self, idx: BlockIndex, block: BlockType, registry: &BlockRegistry) {
        self.composition.set(idx, block);
        self.composition.compact();
        if is_on_any_boundary(idx, self.edge) {
            self.non_opaque_faces = recompute_non_opaque_faces(&self.composition, registry);
        }
    }

    pub fn set_lighting(&mut self, mut lighting: BlockArrayBox<BlockLight>) {
        lighting.compact();
        self.lighting = lighting;
    }
}

fn is_on_any_boundary(idx: BlockIndex, edge: i32) -> bool {
    idx.i == 0 || idx.i == edge - 1 || idx.j == 0 || idx.j == edge - 1 || idx.k == 0 || idx.k == edge - 1
}

/// Recomputes the 6-bit non-opaque-face mask from scratch: bit `d` set iff
/// the boundary layer on face `d` contains at least one transparent voxel.
pub fn recompute_non_opaque_faces(composition: &BlockArrayBox<BlockType>, registry: &BlockRegistry) -> NonOpaqueFaces {
    if !composition.is_allocated() {
        // Unallocated == all Air == fully transparent on every face.
        return NonOpaqueFaces::all();
    }

    let edge = composition.edge();
    let mut mask = NonOpaqueFaces::empty();
    for d in Direction::ALL {
        if mask.contains(NonOpaqueFaces::bit_for(d)) {
            continue;
        }
        'outer: for a in 0..edge {
            for b in 0..edge {
                let idx = boundary_cell(d, edge, a, b);
                if registry.is_transparent(composition.get(idx)) {
                    mask |= NonOpaqueFaces::bit_for(d);
                    break 'outer;
                }
            }
        }
    }
    mask
}

fn boundary_cell(d: Direction, edge: i32, a: i32, b: i32) -> BlockIndex {
    let last = edge - 1;
    match d {
        Direction::West => BlockIndex::new(0, a, b),
        Direction::East => BlockIndex::new(last, a, b),
        Direction::South => BlockIndex::new(a, 0, b),
        Direction::North => BlockIndex::new(a, last, b),
        Direction::Bottom => BlockIndex::new(a, b, 0),
        Direction::Top => BlockIndex::new(a, b, last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunk_is_non_opaque_on_every_face() {
        let chunk = Chunk::new_empty(GlobalIndex::new(0, 0, 0), 4, 15);
        assert_eq!(chunk.non_opaque_faces(), NonOpaqueFaces::all());
        for d in Direction::ALL {
            assert!(!chunk.is_face_opaque(d));
        }
    }

    #[test]
    fn full_stone_chunk_is_face_opaque_everywhere() {
        let registry = {
            let mut r = BlockRegistry::new();
            r.register(crate::block::BlockProperties {
                transparent: false,
                collidable: true,
                textures: crate::block::FaceTextures::Uniform(0),
            });
            r
        };
        let stone = BlockType(1);
        let edge = 4;
        let mut chunk = Chunk::new_empty(GlobalIndex::new(0, 0, 0), edge, 15);
        let values = vec![stone; (edge * edge * edge) as usize];
        let composition = BlockArrayBox::allocated(edge, BlockType::AIR, values);
        chunk.set_composition(composition, &registry);
        for d in Direction::ALL {
            assert!(chunk.is_face_opaque(d));
        }
    }

    #[test]
    fn single_block_mutation_on_boundary_recomputes_cache() {
        let registry = {
            let mut r = BlockRegistry::new();
            r.register(crate::block::BlockProperties {
                transparent: false,
                collidable: true,
                textures: crate::block::FaceTextures::Uniform(0),
            });
            r
        };
        let stone = BlockType(1);
        let edge = 4;
        let mut chunk = Chunk::new_empty(GlobalIndex::new(0, 0, 0), edge, 15);
        // Fill the entire West face boundary layer with stone.
        for a in 0..edge {
            for b in 0..edge {
                chunk.set_block(BlockIndex::new(0, a, b), stone, &registry);
            }
        }
        assert!(chunk.is_face_opaque(Direction::West));
        assert!(!chunk.is_face_opaque(Direction::East));
    }
}
