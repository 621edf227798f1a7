//! Memory pool integration: a realistic churn pattern of many same-sized
//! vertex-buffer-shaped allocations (insert several chunks, unload a few in
//! the middle of the list, load new ones), the way a moving render origin
//! drives `MemoryPool` in practice rather than the few-allocation unit
//! tests beside the implementation.

use bloksel_world::gpu::{GpuBuffer, MemoryPool};

#[derive(Default)]
struct RecordingBuffer {
    data: Vec<u8>,
    resizes: usize,
}

impl GpuBuffer for RecordingBuffer {
    fn resize(&mut self, capacity: i32) {
        self.data.resize(capacity.max(0) as usize, 0);
        self.resizes += 1;
    }
    fn upload(&mut self, offset: u32, data: &[u8]) {
        self.data[offset as usize..offset as usize + data.len()].copy_from_slice(data);
    }
}

fn payload(tag: u8, len: usize) -> Vec<u8> {
    vec![tag; len]
}

#[test]
fn churn_of_uniform_allocations_reuses_freed_regions_without_unbounded_growth() {
    let mut pool = MemoryPool::new(RecordingBuffer::default(), 64);

    let mut addresses = Vec::new();
    for i in 0..8u8 {
        let alloc = pool.malloc(&payload(i, 32)).unwrap();
        addresses.push(alloc.address);
    }
    let capacity_after_initial_fill = pool.capacity();

    // Unload every other chunk (simulating chunks falling outside unload
    // distance as the render origin moves).
    for &addr in addresses.iter().step_by(2) {
        pool.free(addr);
    }

    // Re-load the same count of same-sized chunks; their allocations should
    // land in the freed gaps rather than growing the pool further.
    for i in 8..12u8 {
        pool.malloc(&payload(i, 32)).unwrap();
    }
    assert_eq!(pool.capacity(), capacity_after_initial_fill, "freed regions of the right size must be reused before growing");
}

#[test]
fn realloc_growing_past_its_region_falls_back_to_a_fresh_allocation() {
    let mut pool = MemoryPool::new(RecordingBuffer::default(), 64);
    let a = pool.malloc(&payload(1, 8)).unwrap();
    // A neighbor right after `a` keeps its freed region from coalescing
    // with the pool's free tail, so growing must relocate elsewhere.
    let _b = pool.malloc(&payload(2, 8)).unwrap();
    let grown = pool.realloc(a.address, &payload(3, 40));
    assert_ne!(grown.address, a.address, "growing past the original region must relocate, not corrupt neighbors");
    assert!(pool.is_valid_allocation(grown.address));
    assert_eq!(pool.capacity(), 64, "the free tail already had room; no resize should have been needed");
}
