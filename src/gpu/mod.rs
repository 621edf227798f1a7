//! GPU-resident memory management: a best-fit pool allocator for vertex/index
//! storage, and an indirect multi-draw arena with stable handles.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Abstraction over a GPU-resident growable buffer, so the allocator is
/// testable without an OpenGL context. `GlBuffer` is the real backend.
pub trait GpuBuffer {
    fn resize(&mut self, capacity: i32);
    fn upload(&mut self, offset: u32, data: &[u8]);
}

/// An `SSBO`-backed `GpuBuffer`, bound via `GL_SHADER_STORAGE_BUFFER`.
pub struct GlBuffer {
    id: u32,
    capacity: i32,
}

impl GlBuffer {
    pub fn new() -> Self {
        let mut id = 0;
        unsafe {
            gl::GenBuffers(1, &mut id);
        }
        Self { id, capacity: 0 }
    }

    pub fn bind(&self, binding: u32) {
        unsafe {
            gl::BindBufferBase(gl::SHADER_STORAGE_BUFFER, binding, self.id);
        }
    }
}

impl Default for GlBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBuffer for GlBuffer {
    /// Grows in place via `glCopyBufferSubData` into a freshly-sized buffer,
    /// preserving existing contents (the allocator only ever grows the tail).
    fn resize(&mut self, capacity: i32) {
        let mut resized_id = 0;
        unsafe {
            gl::GenBuffers(1, &mut resized_id);
            gl::BindBuffer(gl::COPY_WRITE_BUFFER, resized_id);
            gl::BufferData(gl::COPY_WRITE_BUFFER, capacity as isize, std::ptr::null(), gl::DYNAMIC_DRAW);

            if self.capacity > 0 {
                gl::BindBuffer(gl::COPY_READ_BUFFER, self.id);
                gl::CopyBufferSubData(gl::COPY_READ_BUFFER, gl::COPY_WRITE_BUFFER, 0, 0, self.capacity as isize);
            }

            gl::DeleteBuffers(1, &self.id);
        }
        self.id = resized_id;
        self.capacity = capacity;
    }

    fn upload(&mut self, offset: u32, data: &[u8]) {
        unsafe {
            gl::BindBuffer(gl::SHADER_STORAGE_BUFFER, self.id);
            gl::BufferSubData(gl::SHADER_STORAGE_BUFFER, offset as isize, data.len() as isize, data.as_ptr() as *const _);
        }
    }
}

impl Drop for GlBuffer {
    fn drop(&mut self) {
        unsafe {
            gl::DeleteBuffers(1, &self.id);
        }
    }
}

const GROWTH_FACTOR: f32 = 1.25;

#[derive(Debug, Clone, Copy)]
struct Region {
    size: i32,
    free: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationResult {
    pub address: u32,
    pub buffer_resized: bool,
}

/// A best-fit allocator over a single growable GPU buffer. Minimizes gaps
/// between allocations without ever relocating a live one; not suited to
/// storing many identically-sized allocations (`malloc`/`free` are
/// `O(log n + m)`, `m` being the number of free regions of the matching
/// size).
pub struct MemoryPool<B: GpuBuffer> {
    buffer: B,
    regions: BTreeMap<u32, Region>,
    free_regions: BTreeSet<(i32, u32)>,
    capacity: i32,
}

impl<B: GpuBuffer> MemoryPool<B> {
    pub fn new(mut buffer: B, initial_capacity: i32) -> Self {
        buffer.resize(initial_capacity);
        let mut pool = Self {
            buffer,
            regions: BTreeMap::new(),
            free_regions: BTreeSet::new(),
            capacity: initial_capacity,
        };
        pool.add_free_region(0, initial_capacity);
        pool
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn is_valid_allocation(&self, address: u32) -> bool {
        self.regions.get(&address).map(|r| !r.free).unwrap_or(false)
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Uploads `data`, growing the pool's tail region (by 1.25x steps) if no
    /// existing free region fits. Returns `None` for empty data.
    pub fn malloc(&mut self, data: &[u8]) -> Option<AllocationResult> {
        if data.is_empty() {
            return None;
        }
        let size = data.len() as i32;
        let mut resized = false;

        let best_free = self.free_regions.range((size, u32::MIN)..).next().copied();
        let address = if let Some((found_size, found_address)) = best_free {
            self.free_regions.remove(&(found_size, found_address));
            found_address
        } else {
            let last_key = *self.regions.keys().next_back().expect("pool always seeds one free region");
            let address = if self.regions[&last_key].free {
                let sz = self.regions[&last_key].size;
                self.free_regions.remove(&(sz, last_key));
                last_key
            } else {
                let new_key = self.capacity as u32;
                self.regions.insert(new_key, Region { size: 0, free: false });
                new_key
            };

            while self.regions[&address].size < size {
                let old_capacity = self.capacity;
                self.capacity = (GROWTH_FACTOR * self.capacity as f32) as i32;
                let delta = self.capacity - old_capacity;
                self.regions.get_mut(&address).unwrap().size += delta;
            }
            log::debug!("gpu pool resizing to {} bytes to fit a {}-byte allocation", self.capacity, size);
            self.buffer.resize(self.capacity);
            resized = true;
            address
        };

        let region = self.regions.get_mut(&address).unwrap();
        let leftover = region.size - size;
        region.size = size;
        region.free = false;
        if leftover > 0 {
            self.add_free_region(address + size as u32, leftover);
        }

        self.buffer.upload(address, data);
        Some(AllocationResult { address, buffer_resized: resized })
    }

    /// Unindexes the allocation at `address`, coalescing it with an
    /// adjacent free region on either side. Does not touch the underlying
    /// buffer contents; the bytes may be overwritten by a later `malloc`.
    pub fn free(&mut self, address: u32) {
        debug_assert!(self.regions.contains_key(&address), "no region at {address}");
        debug_assert!(!self.regions[&address].free, "region at {address} is already free");

        let mut freed_key = address;
        if let Some(prev_key) = self.prev_key(freed_key) {
            if self.regions[&prev_key].free {
                freed_key = self.merge_to_previous(freed_key);
            }
        }
        if let Some(next_key) = self.next_key(freed_key) {
            if self.regions[&next_key].free {
                freed_key = self.merge_to_previous(next_key);
            }
        }

        let region = self.regions.get_mut(&freed_key).unwrap();
        region.free = true;
        self.free_regions.insert((region.size, freed_key));
    }

    /// Overwrites the data at `address` in place if the new data is the
    /// same size; otherwise frees and reallocates.
    pub fn realloc(&mut self, address: u32, data: &[u8]) -> AllocationResult {
        debug_assert!(self.regions.contains_key(&address));
        debug_assert!(!self.regions[&address].free);

        let size = data.len() as i32;
        if size != self.regions[&address].size {
            self.free(address);
            return self.malloc(data).expect("realloc with non-empty data always reallocates");
        }
        self.buffer.upload(address, data);
        AllocationResult { address, buffer_resized: false }
    }

    fn add_free_region(&mut self, address: u32, size: i32) {
        self.regions.insert(address, Region { size, free: true });
        self.free_regions.insert((size, address));
    }

    fn prev_key(&self, key: u32) -> Option<u32> {
        self.regions.range(..key).next_back().map(|(&k, _)| k)
    }

    fn next_key(&self, key: u32) -> Option<u32> {
        self.regions.range((Bound::Excluded(key), Bound::Unbounded)).next().map(|(&k, _)| k)
    }

    /// Merges `key`'s region into its predecessor, removing `key` entirely.
    /// Returns the (now-enlarged) predecessor's key. The merged region is
    /// left marked not-free; callers re-mark it free once both neighbours
    /// have been folded in.
    fn merge_to_previous(&mut self, key: u32) -> u32 {
        let prev_key = self.prev_key(key).expect("merge target must have a predecessor");
        let region_size = self.regions[&key].size;
        if self.regions[&key].free {
            self.free_regions.remove(&(region_size, key));
        }
        let prev_size = self.regions[&prev_key].size;
        if self.regions[&prev_key].free {
            self.free_regions.remove(&(prev_size, prev_key));
        }
        self.regions.remove(&key);
        let prev = self.regions.get_mut(&prev_key).unwrap();
        prev.free = false;
        prev.size += region_size;
        prev_key
    }
}

pub mod arena;
pub use arena::{ChunkArena, DrawHandle, IndirectDrawCommand, MultiDrawArena};
