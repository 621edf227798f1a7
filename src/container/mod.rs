//! The authoritative index→chunk directory and its boundary set: the absent
//! indices adjacent to at least one present, non-face-opaque chunk, i.e. the
//! frontier a streaming loader should fill in next.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::arrays::{BlockArrayBox, BlockBox};
use crate::block::{BlockRegistry, BlockType};
use crate::chunk::{BlockLight, Chunk};
use crate::concurrency::{LockedMap, LockedSet};
use crate::index::GlobalIndex;

pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// The index→chunk map plus its derived boundary set.
pub struct ChunkContainer {
    chunks: LockedMap<GlobalIndex, ChunkHandle>,
    boundary: LockedSet<GlobalIndex>,
    edge: i32,
}

impl ChunkContainer {
    pub fn new(edge: i32) -> Self {
        Self {
            chunks: LockedMap::default(),
            boundary: LockedSet::default(),
            edge,
        }
    }

    pub fn get(&self, idx: GlobalIndex) -> Option<ChunkHandle> {
        self.chunks.get(&idx)
    }

    pub fn contains(&self, idx: GlobalIndex) -> bool {
        self.chunks.contains(&idx)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_on_boundary(&self, idx: GlobalIndex) -> bool {
        self.boundary.contains(&idx)
    }

    /// Inserts a new chunk. No-op (returns `false`) if `idx` is already
    /// present. On success, removes `idx` from the boundary set (it is no
    /// longer absent) and reclassifies every index in its 27-cell stencil.
    pub fn insert(&self, idx: GlobalIndex, chunk: ChunkHandle) -> bool {
        if !self.chunks.insert(idx, chunk) {
            return false;
        }
        self.boundary.remove(&idx);
        for neighbor in idx.stencil_27() {
            self.reclassify(neighbor);
        }
        true
    }

    /// Removes a chunk and reclassifies its stencil neighbours. Returns the
    /// removed handle, if any.
    pub fn erase(&self, idx: GlobalIndex) -> Option<ChunkHandle> {
        let removed = self.chunks.remove(&idx);
        if removed.is_some() {
            self.boundary.remove(&idx);
            for neighbor in idx.stencil_27() {
                self.reclassify(neighbor);
            }
        }
        removed
    }

    /// True iff `idx` has at least one present, non-face-opaque neighbour
    /// facing it: the condition for boundary-set membership, independent of
    /// whether `idx` is currently classified.
    pub fn is_on_boundary_condition(&self, idx: GlobalIndex) -> bool {
        if self.chunks.contains(&idx) {
            return false;
        }
        idx.cardinal_neighbors().into_iter().any(|n| {
            self.chunks
                .get(&n)
                .map(|h| !h.read().is_face_opaque(direction_from(n, idx)))
                .unwrap_or(false)
        })
    }

    fn reclassify(&self, idx: GlobalIndex) {
        let should_be_boundary = !self.chunks.contains(&idx) && self.is_on_boundary_condition(idx);
        if should_be_boundary {
            self.boundary.insert(idx);
        } else {
            self.boundary.remove(&idx);
        }
    }

    /// `hasBoundaryNeighbors`: true iff any cardinal neighbour of `idx` is
    /// currently classified as a boundary index.
    pub fn has_boundary_neighbors(&self, idx: GlobalIndex) -> bool {
        idx.cardinal_neighbors().into_iter().any(|n| self.boundary.contains(&n))
    }

    /// Snapshot of the boundary set intersected with the load-distance
    /// Chebyshev ball around `origin`.
    pub fn find_all_loadable_indices(&self, origin: GlobalIndex, load_distance: i32) -> Vec<GlobalIndex> {
        self.boundary
            .snapshot()
            .into_iter()
            .filter(|idx| idx.chebyshev_distance(origin) <= load_distance)
            .collect()
    }

    pub fn boundary_snapshot(&self) -> std::collections::HashSet<GlobalIndex> {
        self.boundary.snapshot()
    }

    /// Gathers the union of `regions` (which may straddle this chunk's
    /// borders) from the 3x3x3 neighbourhood around `chunk`'s index, taking
    /// a shared lock on each overlapping neighbour in turn. Missing
    /// neighbours contribute `default`.
    pub fn retrieve_type_data(&self, chunk: &Chunk, regions: &[BlockBox]) -> (BlockArrayBox<BlockType>, (i32, i32, i32)) {
        let edge = self.edge;
        let chunk_index = chunk.index();
        BlockArrayBox::gather(regions, BlockType::AIR, |i, j, k| self.sample_neighborhood(chunk_index, edge, i, j, k, |c| c.composition()))
    }

    pub fn retrieve_lighting_data(&self, chunk: &Chunk, regions: &[BlockBox], max_sunlight: BlockLight) -> (BlockArrayBox<BlockLight>, (i32, i32, i32)) {
        let edge = self.edge;
        let chunk_index = chunk.index();
        BlockArrayBox::gather(regions, max_sunlight, |i, j, k| self.sample_neighborhood(chunk_index, edge, i, j, k, |c| c.lighting()))
    }

    fn sample_neighborhood<T: Copy + PartialEq>(
        &self,
        center: GlobalIndex,
        edge: i32,
        i: i32,
        j: i32,
        k: i32,
        field: impl Fn(&Chunk) -> &BlockArrayBox<T>,
    ) -> Option<T> {
        let (neighbor_offset, li, lj, lk) = (
            (i.div_euclid(edge), j.div_euclid(edge), k.div_euclid(edge)),
            i.rem_euclid(edge),
            j.rem_euclid(edge),
            k.rem_euclid(edge),
        );
        let neighbor_index = GlobalIndex::new(
            center.i() + neighbor_offset.0,
            center.j() + neighbor_offset.1,
            center.k() + neighbor_offset.2,
        );
        let handle = self.get(neighbor_index)?;
        let guard = handle.read();
        Some(field(&guard).get(crate::index::BlockIndex::new(li, lj, lk)))
    }
}

fn direction_from(from: GlobalIndex, to: GlobalIndex) -> crate::index::Direction {
    let d = to - from;
    use crate::index::Direction::*;
    if d.x > 0 {
        East
    } else if d.x < 0 {
        West
    } else if d.y > 0 {
        North
    } else if d.y < 0 {
        South
    } else if d.z > 0 {
        Top
    } else {
        Bottom
    }
}
