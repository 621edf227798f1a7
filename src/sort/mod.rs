//! Back-to-front counting sort for transparent voxels.
//!
//! O(n + k) where n is the voxel count and k is the maximum L1 distance
//! two blocks can be apart within a chunk (`3 * (edge - 1)`).

use glam::Vec3;

use crate::index::{BlockIndex, Direction, GlobalIndex};
use crate::mesher::Voxel;

/// Where the sort last ran from; re-sorting is skipped entirely if the
/// viewer hasn't crossed into a new origin block since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState(Option<BlockIndex>);

impl Default for SortState {
    fn default() -> Self {
        Self(None)
    }
}

/// The block index nearest `view_position`, clamped onto whichever face of
/// the chunk (named by `chunk_index` relative to `origin_index`) faces the
/// viewer on each axis that differs from the chunk's own axis.
fn origin_block(chunk_index: GlobalIndex, origin_index: GlobalIndex, view_position: Vec3, block_len: f32, edge: i32) -> BlockIndex {
    let raw = (view_position / block_len).floor();
    let mut block = BlockIndex::new(raw.x as i32, raw.y as i32, raw.z as i32);

    let chunk_coords = [chunk_index.i(), chunk_index.j(), chunk_index.k()];
    let origin_coords = [origin_index.i(), origin_index.j(), origin_index.k()];
    let mut comps = [block.i, block.j, block.k];
    for axis in 0..3 {
        if origin_coords[axis] > chunk_coords[axis] {
            comps[axis] = edge - 1;
        } else if origin_coords[axis] < chunk_coords[axis] {
            comps[axis] = 0;
        }
    }
    block.i = comps[0];
    block.j = comps[1];
    block.k = comps[2];
    block
}

/// Sorts `voxels` back-to-front by L1 distance from `origin_block`, largest
/// key first. Returns `false` (no-op) if the viewer hasn't moved into a new
/// origin block since the last sort.
pub fn sort_transparent_voxels(
    voxels: &mut Vec<Voxel>,
    state: &mut SortState,
    chunk_index: GlobalIndex,
    origin_index: GlobalIndex,
    view_position: Vec3,
    block_len: f32,
    edge: i32,
) -> bool {
    let origin = origin_block(chunk_index, origin_index, view_position, block_len, edge);
    if state.0 == Some(origin) {
        return false;
    }

    let max_l1_distance = (3 * (edge - 1)) as usize;
    let key_of = |v: &Voxel| max_l1_distance - v.index.l1_distance(origin) as usize;

    let mut counts = vec![0i32; max_l1_distance + 1];
    for v in voxels.iter() {
        counts[key_of(v)] += 1;
    }
    for i in 1..counts.len() {
        counts[i] += counts[i - 1];
    }

    let mut placements = counts.clone();
    let mut i = 0usize;
    while i < voxels.len() {
        let key = key_of(&voxels[i]);
        let prev_count = if key > 0 { counts[key - 1] } else { 0 };
        if prev_count <= i as i32 && (i as i32) < counts[key] {
            i += 1;
        } else {
            placements[key] -= 1;
            voxels.swap(i, placements[key] as usize);
        }
    }

    state.0 = Some(origin);
    true
}

/// Rebuilds the index buffer for a freshly-sorted voxel list: per voxel,
/// emits its back-facing quads (relative to the viewer) on each axis first,
/// then its front-facing quads, so early fragments write the farthest
/// geometry and blend correctly against what's already in the colour buffer.
pub fn rebuild_indices(voxels: &[Voxel], chunk_anchor: Vec3, view_position: Vec3, block_len: f32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(voxels.len() * 6);
    for voxel in voxels {
        let block_center = chunk_anchor + block_len * Vec3::new(voxel.index.i as f32, voxel.index.j as f32, voxel.index.k as f32) + Vec3::splat(block_len / 2.0);
        let to_block = block_center - view_position;

        let mut quad_offsets = [-1i32; 6];
        let mut cursor = 0i32;
        for face in Direction::ALL {
            if voxel.face_enabled(face) {
                quad_offsets[face as usize] = cursor;
                cursor += 4;
            }
        }

        for axis in 0..3 {
            let back_positive = component(to_block, axis) > 0.0;
            let face = direction_for_axis(axis, back_positive);
            push_if_enabled(&mut indices, quad_offsets[face as usize], voxel.base_vertex);
        }
        for axis in 0..3 {
            let front_positive = component(to_block, axis) <= 0.0;
            let face = direction_for_axis(axis, front_positive);
            push_if_enabled(&mut indices, quad_offsets[face as usize], voxel.base_vertex);
        }
    }
    indices
}

fn push_if_enabled(indices: &mut Vec<u32>, quad_offset: i32, base_vertex: u32) {
    if quad_offset >= 0 {
        let base = base_vertex + quad_offset as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
    }
}

fn component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn direction_for_axis(axis: usize, positive: bool) -> Direction {
    match (axis, positive) {
        (0, true) => Direction::East,
        (0, false) => Direction::West,
        (1, true) => Direction::North,
        (1, false) => Direction::South,
        (2, true) => Direction::Top,
        _ => Direction::Bottom,
    }
}
