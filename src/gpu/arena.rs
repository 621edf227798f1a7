//! Indirect multi-draw arena: a dense, GPU-upload-ready array of
//! `glMultiDrawElementsIndirect` records addressed by stable handles rather
//! than positions, since a chunk's slot moves on every removal-driven
//! compaction (insert on mesh-ready, remove on unload, resort each frame
//! the viewer crosses a chunk boundary).

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::GpuBuffer;

/// One `glMultiDrawElementsIndirect` record: 5 `GLuint`s in the layout
/// OpenGL expects directly in the indirect buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectDrawCommand {
    pub count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

/// A stable reference to a slot in a `MultiDrawArena`. Survives other
/// entries being inserted or removed; only invalidated by removing this
/// entry itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawHandle(u32);

/// Dense storage for indirect draw commands, keyed by handle rather than
/// position so the backing `Vec` can be freely reordered (for distance
/// sorting) or compacted (on removal) without callers tracking slot moves.
///
/// Sort order is a simple stable-sort pass rather than a partition, which is
/// plenty straightforward where the draw count per chunk is small (hundreds,
/// not millions).
pub struct MultiDrawArena {
    commands: Vec<IndirectDrawCommand>,
    owners: Vec<DrawHandle>,
    distances: Vec<f32>,
    slots: HashMap<DrawHandle, usize>,
    next_handle: u32,
}

impl MultiDrawArena {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            owners: Vec::new(),
            distances: Vec::new(),
            slots: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Inserts a new draw command at the given distance from the viewer
    /// (units are whatever the caller sorts by, typically L2 or L1 distance
    /// to chunk center). Returns a handle stable across future insertions,
    /// removals, and resorts.
    pub fn insert(&mut self, command: IndirectDrawCommand, distance: f32) -> DrawHandle {
        let handle = DrawHandle(self.next_handle);
        self.next_handle += 1;

        let index = self.commands.len();
        self.commands.push(command);
        self.owners.push(handle);
        self.distances.push(distance);
        self.slots.insert(handle, index);
        handle
    }

    /// Removes the entry for `handle`, swapping the last entry into its
    /// slot to keep the backing storage dense. O(1) besides the hash
    /// lookups.
    pub fn remove(&mut self, handle: DrawHandle) -> Option<IndirectDrawCommand> {
        let index = self.slots.remove(&handle)?;
        let last = self.commands.len() - 1;

        self.commands.swap(index, last);
        self.owners.swap(index, last);
        self.distances.swap(index, last);

        let removed = self.commands.pop().unwrap();
        self.owners.pop();
        self.distances.pop();

        if index < self.commands.len() {
            let moved_handle = self.owners[index];
            self.slots.insert(moved_handle, index);
        }
        Some(removed)
    }

    /// Overwrites the command stored at `handle` in place (e.g. a chunk's
    /// mesh was rebuilt with a different index count) without touching its
    /// distance or position.
    pub fn update_command(&mut self, handle: DrawHandle, command: IndirectDrawCommand) {
        if let Some(&index) = self.slots.get(&handle) {
            self.commands[index] = command;
        }
    }

    pub fn update_distance(&mut self, handle: DrawHandle, distance: f32) {
        if let Some(&index) = self.slots.get(&handle) {
            self.distances[index] = distance;
        }
    }

    /// Partitions entries in place into `[0, split)` within `max_distance`
    /// and `[split, len)` beyond it, via a Hoare-style two-pointer swap.
    /// Callers issue `glMultiDrawElementsIndirect` over only the first
    /// `split` entries, skipping chunks outside draw distance without a
    /// separate visibility array. Returns `split`.
    pub fn partition_by_range(&mut self, max_distance: f32) -> usize {
        if self.commands.is_empty() {
            return 0;
        }
        let mut left = 0isize;
        let mut right = self.commands.len() as isize - 1;
        loop {
            while left <= right && self.distances[left as usize] <= max_distance {
                left += 1;
            }
            while right >= left && self.distances[right as usize] > max_distance {
                right -= 1;
            }
            if left >= right {
                break;
            }
            self.swap_slots(left as usize, right as usize);
            left += 1;
            right -= 1;
        }
        left as usize
    }

    /// Stable-sorts the `[0, count)` visible prefix by distance, ascending
    /// (front-to-back; correct draw order for opaque geometry, letting
    /// early-Z reject occluded fragments) or descending (back-to-front, for
    /// the transparent pass).
    pub fn sort_prefix(&mut self, count: usize, ascending: bool) {
        let count = count.min(self.commands.len());
        let mut order: Vec<usize> = (0..count).collect();
        if ascending {
            order.sort_by(|&a, &b| self.distances[a].partial_cmp(&self.distances[b]).unwrap());
        } else {
            order.sort_by(|&a, &b| self.distances[b].partial_cmp(&self.distances[a]).unwrap());
        }

        let commands: Vec<_> = order.iter().map(|&i| self.commands[i]).collect();
        let owners: Vec<_> = order.iter().map(|&i| self.owners[i]).collect();
        let distances: Vec<_> = order.iter().map(|&i| self.distances[i]).collect();

        self.commands[..count].copy_from_slice(&commands);
        self.owners[..count].copy_from_slice(&owners);
        self.distances[..count].copy_from_slice(&distances);
        for (i, &handle) in self.owners[..count].iter().enumerate() {
            self.slots.insert(handle, i);
        }
    }

    /// The commands ready for a `glMultiDrawElementsIndirect` call, in
    /// current storage order. Callers slice to the `partition_by_range`
    /// split point to draw only in-range entries.
    pub fn commands(&self) -> &[IndirectDrawCommand] {
        &self.commands
    }

    /// The handle owning the entry currently at `index`. Used by
    /// `ChunkArena::modify_indices` to map a storage slot back to the
    /// identity it belongs to without threading a second parallel array.
    pub fn owner_at(&self, index: usize) -> DrawHandle {
        self.owners[index]
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.commands.swap(a, b);
        self.owners.swap(a, b);
        self.distances.swap(a, b);
        self.slots.insert(self.owners[a], a);
        self.slots.insert(self.owners[b], b);
    }
}

impl Default for MultiDrawArena {
    fn default() -> Self {
        Self::new()
    }
}


/// Retained CPU-side state a transparent chunk's draw command needs to
/// survive frame to frame so it can be re-sorted without re-meshing: the
/// voxel list the counting sort reorders, and the last index buffer it
/// produced (so `modify_indices` always has something to diff length
/// against). Opaque commands drop this after upload.
struct Retained {
    voxels: Vec<crate::mesher::Voxel>,
    indices: Vec<u32>,
}

struct Entry {
    vertex_addr: u32,
    index_addr: Option<u32>,
    index_region_size: i32,
    retained: Option<Retained>,
}

/// One chunk's full GPU-resident payload: its vertex/index pool
/// allocations plus its slot in the dense draw-command vector. A chunk's
/// draw command lives in exactly one of two arenas (opaque or transparent);
/// the arena the caller picks enforces that by construction.
pub struct ChunkArena<B: GpuBuffer> {
    vertex_pool: super::MemoryPool<B>,
    index_pool: super::MemoryPool<B>,
    dense: MultiDrawArena,
    identities: HashMap<crate::index::GlobalIndex, DrawHandle>,
    entries: HashMap<DrawHandle, Entry>,
}

impl<B: GpuBuffer> ChunkArena<B> {
    pub fn new(vertex_buffer: B, index_buffer: B, initial_capacity: i32) -> Self {
        Self {
            vertex_pool: super::MemoryPool::new(vertex_buffer, initial_capacity),
            index_pool: super::MemoryPool::new(index_buffer, initial_capacity),
            dense: MultiDrawArena::new(),
            identities: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn contains(&self, identity: crate::index::GlobalIndex) -> bool {
        self.identities.contains_key(&identity)
    }

    /// Allocates vertex/index storage for `vertices`/`indices`, uploads
    /// them, and places the command at the tail with `distance` as its
    /// initial sort key. `retain_voxels` is `Some` for transparent meshes
    /// (the voxel list the per-frame resort needs) and `None` for opaque
    /// ones, which never need to be resorted after upload. Replaces any
    /// prior entry for `identity`.
    pub fn insert(
        &mut self,
        identity: crate::index::GlobalIndex,
        vertices: &[crate::mesher::PackedVertex],
        indices: &[u32],
        retain_voxels: Option<Vec<crate::mesher::Voxel>>,
        distance: f32,
    ) -> DrawHandle {
        self.remove(identity);

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let vertex_alloc = self.vertex_pool.malloc(vertex_bytes);
        let vertex_addr = vertex_alloc.map(|a| a.address).unwrap_or(0);
        let vertex_stride = std::mem::size_of::<crate::mesher::PackedVertex>() as u32;
        let base_vertex = (vertex_addr / vertex_stride) as i32;

        let index_stride = std::mem::size_of::<u32>() as u32;
        let (index_addr, first_index, index_region_size) = if indices.is_empty() {
            (None, 0u32, 0i32)
        } else {
            let index_bytes: &[u8] = bytemuck::cast_slice(indices);
            let alloc = self.index_pool.malloc(index_bytes).expect("non-empty index data always allocates");
            (Some(alloc.address), alloc.address / index_stride, index_bytes.len() as i32)
        };

        let command = IndirectDrawCommand {
            count: indices.len() as u32,
            instance_count: 1,
            first_index,
            base_vertex,
            base_instance: 0,
        };
        let handle = self.dense.insert(command, distance);
        self.identities.insert(identity, handle);
        self.entries.insert(
            handle,
            Entry {
                vertex_addr,
                index_addr,
                index_region_size,
                retained: retain_voxels.map(|voxels| Retained { voxels, indices: indices.to_vec() }),
            },
        );
        handle
    }

    /// Removes `identity`'s entry, if present, freeing its pool regions.
    pub fn remove(&mut self, identity: crate::index::GlobalIndex) -> bool {
        let Some(handle) = self.identities.remove(&identity) else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&handle) {
            self.vertex_pool.free(entry.vertex_addr);
            if let Some(index_addr) = entry.index_addr {
                self.index_pool.free(index_addr);
            }
        }
        self.dense.remove(handle);
        true
    }

    pub fn update_distance(&mut self, identity: crate::index::GlobalIndex, distance: f32) {
        if let Some(&handle) = self.identities.get(&identity) {
            self.dense.update_distance(handle, distance);
        }
    }

    /// Moves in-range entries to the front, returns their count.
    pub fn partition_by_range(&mut self, max_distance: f32) -> usize {
        self.dense.partition_by_range(max_distance)
    }

    /// Stable-sorts the visible prefix by distance.
    pub fn sort_prefix(&mut self, count: usize, ascending: bool) {
        self.dense.sort_prefix(count, ascending)
    }

    /// For each of the first `count` entries (in current storage order),
    /// lets `f` rewrite that chunk's retained index buffer against its
    /// retained voxel list. If `f` reports a change, the new indices are
    /// re-uploaded to the index pool; if they outgrew the original
    /// allocation the change is dropped with a warning rather than
    /// relocating mid-frame.
    pub fn modify_indices(
        &mut self,
        count: usize,
        mut f: impl FnMut(crate::index::GlobalIndex, &[crate::mesher::Voxel], &mut Vec<u32>) -> bool,
    ) {
        let count = count.min(self.dense.len());
        for slot in 0..count {
            let handle = self.dense.owner_at(slot);
            let identity = match self.identities.iter().find(|(_, &h)| h == handle) {
                Some((&id, _)) => id,
                None => continue,
            };
            let Some(entry) = self.entries.get_mut(&handle) else { continue };
            let Some(retained) = entry.retained.as_mut() else { continue };

            let changed = f(identity, &retained.voxels, &mut retained.indices);
            if !changed {
                continue;
            }

            let new_bytes: &[u8] = bytemuck::cast_slice(&retained.indices);
            if new_bytes.len() as i32 > entry.index_region_size {
                log::warn!(
                    "dropping index rebuild for chunk {:?}: grew from {} to {} bytes, which the arena does not reallocate mid-frame",
                    identity,
                    entry.index_region_size,
                    new_bytes.len()
                );
                continue;
            }

            if let Some(index_addr) = entry.index_addr {
                let result = self.index_pool.realloc(index_addr, new_bytes);
                entry.index_addr = Some(result.address);
                let index_stride = std::mem::size_of::<u32>() as u32;
                let mut command = self.dense.commands()[slot];
                command.count = retained.indices.len() as u32;
                command.first_index = result.address / index_stride;
                self.dense.update_command(handle, command);
            }
        }
    }

    pub fn commands(&self) -> &[IndirectDrawCommand] {
        self.dense.commands()
    }

    pub fn retained_voxels(&self, identity: crate::index::GlobalIndex) -> Option<&[crate::mesher::Voxel]> {
        let handle = self.identities.get(&identity)?;
        self.entries.get(handle)?.retained.as_ref().map(|r| r.voxels.as_slice())
    }
}

#[cfg(test)]
mod chunk_arena_tests {
    use super::*;
    use crate::index::GlobalIndex;
    use crate::mesher::PackedVertex;

    #[derive(Default)]
    struct FakeBuffer {
        data: Vec<u8>,
    }

    impl GpuBuffer for FakeBuffer {
        fn resize(&mut self, capacity: i32) {
            self.data.resize(capacity.max(0) as usize, 0);
        }
        fn upload(&mut self, offset: u32, data: &[u8]) {
            self.data[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        }
    }

    fn vertex(i: i32) -> PackedVertex {
        PackedVertex::new(crate::index::BlockIndex::new(i, 0, 0), 0, 0, 15, 0)
    }

    #[test]
    fn insert_then_remove_frees_both_pools() {
        let mut arena = ChunkArena::new(FakeBuffer::default(), FakeBuffer::default(), 256);
        let identity = GlobalIndex::new(0, 0, 0);
        let vertices = vec![vertex(0), vertex(1), vertex(2), vertex(3)];
        let indices = vec![0, 1, 2, 1, 3, 2];
        arena.insert(identity, &vertices, &indices, None, 10.0);
        assert!(arena.contains(identity));
        assert_eq!(arena.commands()[0].count, 6);

        assert!(arena.remove(identity));
        assert!(!arena.contains(identity));
        assert!(arena.is_empty());
    }

    #[test]
    fn insert_replacing_same_identity_drops_the_old_entry() {
        let mut arena = ChunkArena::new(FakeBuffer::default(), FakeBuffer::default(), 256);
        let identity = GlobalIndex::new(1, 1, 1);
        arena.insert(identity, &[vertex(0)], &[], None, 5.0);
        arena.insert(identity, &[vertex(0), vertex(1)], &[], None, 5.0);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn modify_indices_shrinking_is_applied() {
        let mut arena = ChunkArena::new(FakeBuffer::default(), FakeBuffer::default(), 256);
        let identity = GlobalIndex::new(2, 0, 0);
        let voxel = crate::mesher::Voxel { index: crate::index::BlockIndex::new(0, 0, 0), enabled_faces: [true; 6], base_vertex: 0 };
        let vertices = vec![vertex(0), vertex(1), vertex(2), vertex(3)];
        let indices = vec![0, 1, 2, 1, 3, 2];
        arena.insert(identity, &vertices, &indices, Some(vec![voxel]), 1.0);

        arena.modify_indices(1, |_id, _voxels, idx| {
            idx.truncate(3);
            true
        });
        assert_eq!(arena.commands()[0].count, 3);
    }

    #[test]
    fn modify_indices_growth_beyond_original_allocation_is_dropped() {
        let mut arena = ChunkArena::new(FakeBuffer::default(), FakeBuffer::default(), 256);
        let identity = GlobalIndex::new(3, 0, 0);
        let voxel = crate::mesher::Voxel { index: crate::index::BlockIndex::new(0, 0, 0), enabled_faces: [true; 6], base_vertex: 0 };
        let vertices = vec![vertex(0), vertex(1), vertex(2), vertex(3)];
        let indices = vec![0, 1, 2, 1, 3, 2];
        arena.insert(identity, &vertices, &indices, Some(vec![voxel]), 1.0);
        let original_count = arena.commands()[0].count;

        arena.modify_indices(1, |_id, _voxels, idx| {
            idx.extend_from_slice(&[0, 1, 2, 1, 3, 2]);
            true
        });
        assert_eq!(arena.commands()[0].count, original_count, "grown index buffer must be rejected, not applied");
    }
}
