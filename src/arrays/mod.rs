//! Boxed 3D arrays over a chunk's `[0, N)^3` lattice, with an "unallocated"
//! representation standing in for a uniform default value.

use crate::index::BlockIndex;

/// An axis-aligned region of block indices, `[min, max)` on each axis. May
/// straddle chunk borders; used by `retrieveTypeData`/`retrieveLightingData`
/// to describe the union of cells a caller wants gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBox {
    pub min: (i32, i32, i32),
    pub max: (i32, i32, i32),
}

impl BlockBox {
    pub fn new(min: (i32, i32, i32), max: (i32, i32, i32)) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, i: i32, j: i32, k: i32) -> bool {
        i >= self.min.0 && i < self.max.0 && j >= self.min.1 && j < self.max.1 && k >= self.min.2 && k < self.max.2
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        (self.min.0..self.max.0).flat_map(move |i| {
            (self.min.1..self.max.1).flat_map(move |j| (self.min.2..self.max.2).map(move |k| (i, j, k)))
        })
    }
}

/// A dense `N x N x N` array that can be dropped to a single default value
/// when every logical cell equals it (the "unallocated" chunk optimisation).
#[derive(Debug, Clone)]
pub struct BlockArrayBox<T> {
    edge: i32,
    default: T,
    data: Option<Vec<T>>,
}

impl<T: Copy + PartialEq> BlockArrayBox<T> {
    pub fn unallocated(edge: i32, default: T) -> Self {
        Self { edge, default, data: None }
    }

    pub fn allocated(edge: i32, default: T, values: Vec<T>) -> Self {
        debug_assert_eq!(values.len(), (edge * edge * edge) as usize);
        Self { edge, default, data: Some(values) }
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    #[inline]
    fn flatten(&self, idx: BlockIndex) -> usize {
        let e = self.edge;
        (idx.i * e * e + idx.j * e + idx.k) as usize
    }

    pub fn get(&self, idx: BlockIndex) -> T {
        debug_assert!(idx.in_bounds(self.edge));
        match &self.data {
            Some(d) => d[self.flatten(idx)],
            None => self.default,
        }
    }

    /// Sets a voxel, allocating backing storage on first write if needed.
    pub fn set(&mut self, idx: BlockIndex, value: T) {
        debug_assert!(idx.in_bounds(self.edge));
        if self.data.is_none() {
            if value == self.default {
                return;
            }
            let volume = (self.edge * self.edge * self.edge) as usize;
            self.data = Some(vec![self.default; volume]);
        }
        let flat = self.flatten(idx);
        self.data.as_mut().unwrap()[flat] = value;
    }

    /// Drops the backing allocation if every logical cell equals `default`.
    /// Called after bulk writes, such as a terrain fill or a lighting pass.
    pub fn compact(&mut self) {
        if let Some(d) = &self.data {
            if d.iter().all(|v| *v == self.default) {
                self.data = None;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockIndex, T)> + '_ {
        let e = self.edge;
        (0..e).flat_map(move |i| {
            (0..e).flat_map(move |j| {
                (0..e).map(move |k| {
                    let idx = BlockIndex::new(i, j, k);
                    (idx, self.get(idx))
                })
            })
        })
    }

    /// Gathers the subregions named by `regions` into a freshly allocated
    /// box whose indexing is relative to `regions`' combined bounding box's
    /// minimum corner, filling cells the region doesn't touch with
    /// `fill_default`. Used by `ChunkContainer::retrieve*Data` across a
    /// multi-chunk gather.
    pub fn gather(regions: &[BlockBox], fill_default: T, mut sample: impl FnMut(i32, i32, i32) -> Option<T>) -> (BlockArrayBox<T>, (i32, i32, i32)) {
        let min = regions.iter().fold((i32::MAX, i32::MAX, i32::MAX), |acc, r| {
            (acc.0.min(r.min.0), acc.1.min(r.min.1), acc.2.min(r.min.2))
        });
        let max = regions.iter().fold((i32::MIN, i32::MIN, i32::MIN), |acc, r| {
            (acc.0.max(r.max.0), acc.1.max(r.max.1), acc.2.max(r.max.2))
        });
        let edge = (max.0 - min.0).max(max.1 - min.1).max(max.2 - min.2).max(1);
        let mut out = BlockArrayBox::unallocated(edge, fill_default);
        for region in regions {
            for (i, j, k) in region.iter() {
                if let Some(v) = sample(i, j, k) {
                    if v != fill_default {
                        out.set(BlockIndex::new(i - min.0, j - min.1, k - min.2), v);
                    }
                }
            }
        }
        (out, min)
    }
}
