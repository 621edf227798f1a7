//! Fundamental lattice indices: chunk-scale (`GlobalIndex`, `LocalIndex`) and
//! block-scale (`BlockIndex`) addresses, plus the six axis-aligned `Direction`s.

use glam::{IVec3, Vec3};
use std::ops::{Add, Neg, Sub};

/// Identifies a chunk in the infinite world lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GlobalIndex(pub IVec3);

impl GlobalIndex {
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self(IVec3::new(i, j, k))
    }

    pub fn i(self) -> i32 {
        self.0.x
    }
    pub fn j(self) -> i32 {
        self.0.y
    }
    pub fn k(self) -> i32 {
        self.0.z
    }

    /// Chebyshev distance between two chunk indices.
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        let d = (self.0 - other.0).abs();
        d.x.max(d.y).max(d.z)
    }

    /// Express this index relative to `origin`, clamped to `i16` range.
    /// Panics in debug if the offset overflows `i16`; callers are expected to
    /// keep `origin` near enough that this never happens in practice (render
    /// and load distances are far below `i16::MAX`).
    pub fn to_local(self, origin: Self) -> LocalIndex {
        let d = self.0 - origin.0;
        debug_assert!(d.x.abs() <= i16::MAX as i32 && d.y.abs() <= i16::MAX as i32 && d.z.abs() <= i16::MAX as i32);
        LocalIndex {
            i: d.x as i16,
            j: d.y as i16,
            k: d.z as i16,
        }
    }

    /// The 27-cell stencil centered on this index (including itself).
    pub fn stencil_27(self) -> impl Iterator<Item = Self> {
        let base = self.0;
        (-1..=1).flat_map(move |di| {
            (-1..=1).flat_map(move |dj| (-1..=1).map(move |dk| Self(base + IVec3::new(di, dj, dk))))
        })
    }

    /// The six face-adjacent cardinal neighbours.
    pub fn cardinal_neighbors(self) -> [Self; 6] {
        Direction::ALL.map(|d| self + d)
    }
}

impl Add<Direction> for GlobalIndex {
    type Output = GlobalIndex;
    fn add(self, rhs: Direction) -> GlobalIndex {
        GlobalIndex(self.0 + rhs.offset())
    }
}

impl Sub for GlobalIndex {
    type Output = IVec3;
    fn sub(self, rhs: Self) -> IVec3 {
        self.0 - rhs.0
    }
}

/// A `GlobalIndex` expressed relative to the current origin chunk. Guaranteed
/// to fit in 16-bit signed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalIndex {
    pub i: i16,
    pub j: i16,
    pub k: i16,
}

impl LocalIndex {
    pub fn to_global(self, origin: GlobalIndex) -> GlobalIndex {
        GlobalIndex(origin.0 + IVec3::new(self.i as i32, self.j as i32, self.k as i32))
    }
}

/// A voxel address within a chunk, components in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockIndex {
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

impl BlockIndex {
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self { i, j, k }
    }

    pub fn in_bounds(self, edge: i32) -> bool {
        (0..edge).contains(&self.i) && (0..edge).contains(&self.j) && (0..edge).contains(&self.k)
    }

    pub fn l1_distance(self, other: Self) -> i32 {
        (self.i - other.i).abs() + (self.j - other.j).abs() + (self.k - other.k).abs()
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.i, self.j, self.k)
    }

    pub fn checked_add(self, d: Direction, edge: i32) -> Option<Self> {
        let v = self.as_ivec3() + d.offset();
        let candidate = Self::new(v.x, v.y, v.z);
        candidate.in_bounds(edge).then_some(candidate)
    }

    /// World-space anchor of this block's min corner, given the chunk's
    /// global index and configured block length.
    pub fn world_anchor(self, chunk: GlobalIndex, edge: i32, block_len: f32) -> Vec3 {
        Vec3::new(
            (chunk.i() * edge + self.i) as f32 * block_len,
            (chunk.j() * edge + self.j) as f32 * block_len,
            (chunk.k() * edge + self.k) as f32 * block_len,
        )
    }
}

/// One of the six axis-aligned unit directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    West,  // -X
    East,  // +X
    South, // -Y
    North, // +Y
    Bottom, // -Z
    Top,    // +Z
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
        Direction::Bottom,
        Direction::Top,
    ];

    /// The three "positive" directions of each axis, used to iterate unique
    /// axis pairs without double-visiting.
    pub const POSITIVE: [Direction; 3] = [Direction::East, Direction::North, Direction::Top];

    pub const fn axis(self) -> usize {
        match self {
            Direction::West | Direction::East => 0,
            Direction::South | Direction::North => 1,
            Direction::Bottom | Direction::Top => 2,
        }
    }

    pub const fn is_positive(self) -> bool {
        matches!(self, Direction::East | Direction::North | Direction::Top)
    }

    pub const fn offset(self) -> IVec3 {
        match self {
            Direction::West => IVec3::NEG_X,
            Direction::East => IVec3::X,
            Direction::South => IVec3::NEG_Y,
            Direction::North => IVec3::Y,
            Direction::Bottom => IVec3::NEG_Z,
            Direction::Top => IVec3::Z,
        }
    }
}

impl Neg for Direction {
    type Output = Direction;
    fn neg(self) -> Direction {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
            Direction::Bottom => Direction::Top,
            Direction::Top => Direction::Bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_opposite_is_involutive() {
        for d in Direction::ALL {
            assert_eq!(-(-d), d);
            assert_ne!(-d, d);
        }
    }

    #[test]
    fn global_to_local_roundtrip() {
        let origin = GlobalIndex::new(10, -3, 7);
        let g = GlobalIndex::new(12, -5, 9);
        let local = g.to_local(origin);
        assert_eq!(local.to_global(origin), g);
    }

    #[test]
    fn stencil_27_contains_center_and_all_neighbors() {
        let c = GlobalIndex::new(0, 0, 0);
        let cells: Vec<_> = c.stencil_27().collect();
        assert_eq!(cells.len(), 27);
        assert!(cells.contains(&c));
        for d in Direction::ALL {
            assert!(cells.contains(&(c + d)));
        }
    }

    #[test]
    fn block_index_l1_distance() {
        let a = BlockIndex::new(0, 0, 0);
        let b = BlockIndex::new(3, 4, 5);
        assert_eq!(a.l1_distance(b), 12);
    }

    #[test]
    fn chebyshev_distance_is_max_component() {
        let a = GlobalIndex::new(0, 0, 0);
        let b = GlobalIndex::new(3, -7, 2);
        assert_eq!(a.chebyshev_distance(b), 7);
    }
}
