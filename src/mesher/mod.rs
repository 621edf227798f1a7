//! Per-face quad emission with baked sunlight and ambient occlusion.

use bytemuck::{Pod, Zeroable};

use crate::arrays::BlockBox;
use crate::block::{BlockRegistry, BlockType};
use crate::chunk::{BlockLight, Chunk};
use crate::container::ChunkContainer;
use crate::index::{BlockIndex, Direction};

/// The 8-byte packed vertex the GPU consumes directly: relative position
/// (6 bits/axis), quad index (2 bits), texture ID (12 bits) in the first
/// word; sunlight (4 bits) and ambient occlusion (3 bits) in the second.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedVertex {
    pub vertex_data: u32,
    pub lighting_data: u32,
}

impl PackedVertex {
    pub fn new(placement: BlockIndex, quad_index: u32, texture: u16, sunlight: u32, ao: u32) -> Self {
        let vertex_data = (placement.i as u32) | ((placement.j as u32) << 6) | ((placement.k as u32) << 12) | (quad_index << 18) | ((texture as u32 & 0xFFF) << 20);
        let lighting_data = (sunlight << 16) | (ao << 20);
        Self { vertex_data, lighting_data }
    }
}

/// The renderable portion of a single voxel: which faces are visible and
/// where its quads start in the vertex buffer. Retained only for
/// transparent draw commands, which must be re-sorted every frame.
#[derive(Debug, Clone, Copy)]
pub struct Voxel {
    pub index: BlockIndex,
    pub enabled_faces: [bool; 6],
    pub base_vertex: u32,
}

impl Voxel {
    pub fn face_enabled(&self, d: Direction) -> bool {
        self.enabled_faces[face_slot(d)]
    }
}

fn face_slot(d: Direction) -> usize {
    Direction::ALL.iter().position(|x| *x == d).unwrap()
}

/// A chunk's meshed output: one contiguous vertex/index buffer plus, for
/// draw commands that need per-frame resorting, the voxel list that backs
/// the sort in the `sort` module.
#[derive(Debug, Clone, Default)]
pub struct MeshedDraw {
    pub vertices: Vec<PackedVertex>,
    pub indices: Vec<u32>,
    pub voxels: Vec<Voxel>,
}

impl MeshedDraw {
    fn add_quad(&mut self, block_index: BlockIndex, face: Direction, texture: u16, sunlight: [u32; 4], ao: [u32; 4]) {
        const STANDARD: [usize; 4] = [0, 1, 2, 3];
        const REVERSED: [usize; 4] = [1, 3, 0, 2];
        let total = |i: usize| sunlight[i] as i32 + ao[i] as i32;
        let standard_seam = (total(2) - total(1)).abs();
        let reversed_seam = (total(3) - total(0)).abs();
        let order = if standard_seam > reversed_seam { &REVERSED } else { &STANDARD };

        let base = self.vertices.len() as u32;
        for &quad_index in order {
            let placement = offset(block_index, face, quad_index);
            self.vertices.push(PackedVertex::new(placement, quad_index as u32, texture, sunlight[quad_index], ao[quad_index]));
        }
        add_quad_indices(&mut self.indices, base);
    }

    fn add_voxel(&mut self, block_index: BlockIndex, enabled_faces: [bool; 6], base_vertex: u32) {
        self.voxels.push(Voxel { index: block_index, enabled_faces, base_vertex });
    }
}

fn add_quad_indices(indices: &mut Vec<u32>, base: u32) {
    indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
}

/// The four corner offsets of a face's quad, in emission order 0..3.
fn offset(block_index: BlockIndex, face: Direction, quad_index: usize) -> BlockIndex {
    const TABLE: [[(i32, i32, i32); 4]; 6] = [
        [(0, 1, 0), (0, 0, 0), (0, 1, 1), (0, 0, 1)], // West
        [(1, 0, 0), (1, 1, 0), (1, 0, 1), (1, 1, 1)], // East
        [(0, 0, 0), (1, 0, 0), (0, 0, 1), (1, 0, 1)], // South
        [(1, 1, 0), (0, 1, 0), (1, 1, 1), (0, 1, 1)], // North
        [(0, 1, 0), (1, 1, 0), (0, 0, 0), (1, 0, 0)], // Bottom
        [(0, 0, 1), (1, 0, 1), (0, 1, 1), (1, 1, 1)], // Top
    ];
    let (di, dj, dk) = TABLE[face as usize][quad_index];
    BlockIndex::new(block_index.i + di, block_index.j + dj, block_index.k + dk)
}

fn component(axis: usize, t: (i32, i32, i32)) -> i32 {
    match axis {
        0 => t.0,
        1 => t.1,
        _ => t.2,
    }
}

fn cycle(axis: usize) -> usize {
    (axis + 1) % 3
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

/// Meshes a whole chunk into its opaque and transparent draw outputs; an
/// entirely-air chunk returns two empty draws.
pub fn mesh_chunk(container: &ChunkContainer, chunk: &Chunk, registry: &BlockRegistry) -> (MeshedDraw, MeshedDraw) {
    let mut opaque = MeshedDraw::default();
    let mut transparent = MeshedDraw::default();
    if chunk.is_empty() {
        return (opaque, transparent);
    }

    let edge = chunk.edge();
    let halo_box = [BlockBox::new((-1, -1, -1), (edge + 1, edge + 1, edge + 1))];
    let (composition, _) = container.retrieve_type_data(chunk, &halo_box);
    let (lighting, _) = container.retrieve_lighting_data(chunk, &halo_box, chunk.max_sunlight());

    let get_comp = |i: i32, j: i32, k: i32| -> BlockType { composition.get(BlockIndex::new(i + 1, j + 1, k + 1)) };
    let get_light = |i: i32, j: i32, k: i32| -> BlockLight { lighting.get(BlockIndex::new(i + 1, j + 1, k + 1)) };

    for i in 0..edge {
        for j in 0..edge {
            for k in 0..edge {
                let block_index = BlockIndex::new(i, j, k);
                let block_type = get_comp(i, j, k);
                if block_type.is_air() {
                    continue;
                }
                let transparent_block = registry.is_transparent(block_type);
                let mut enabled_faces = [false; 6];
                let mut any_face = false;
                let draw = if transparent_block { &mut transparent } else { &mut opaque };
                let base_vertex_for_voxel = draw.vertices.len() as u32;

                for face in Direction::ALL {
                    let o = face.offset();
                    let (ci, cj, ck) = (i + o.x, j + o.y, k + o.z);
                    let neighbor = get_comp(ci, cj, ck);
                    let neighbor_transparent = registry.is_transparent(neighbor);
                    if neighbor == block_type || (!transparent_block && !neighbor_transparent) {
                        continue;
                    }

                    enabled_faces[face_slot(face)] = true;
                    any_face = true;

                    let mut sunlight = [0u32; 4];
                    for quad_index in 0..4 {
                        let v = offset(block_index, face, quad_index);
                        let mut total = 0u32;
                        let mut count = 0u32;
                        for di in -1..=0 {
                            for dj in -1..=0 {
                                for dk in -1..=0 {
                                    let (li, lj, lk) = (v.i + di, v.j + dj, v.k + dk);
                                    if registry.is_transparent(get_comp(li, lj, lk)) {
                                        total += get_light(li, lj, lk) as u32;
                                        count += 1;
                                    }
                                }
                            }
                        }
                        sunlight[quad_index] = total / count.max(1);
                    }

                    let mut ao = [0u32; 4];
                    if !transparent_block {
                        let u = face.axis();
                        let v_axis = cycle(u);
                        let w_axis = cycle(v_axis);
                        for quad_index in 0..4 {
                            let corner = offset(block_index, face, quad_index);
                            let corner_tuple = (corner.i - block_index.i - o.x, corner.j - block_index.j - o.y, corner.k - block_index.k - o.z);
                            let edge_a_dir = direction_for_axis(v_axis, component(v_axis, corner_tuple) != 0);
                            let edge_b_dir = direction_for_axis(w_axis, component(w_axis, corner_tuple) != 0);

                            let a_off = edge_a_dir.offset();
                            let b_off = edge_b_dir.offset();
                            let edge_a = (ci + a_off.x, cj + a_off.y, ck + a_off.z);
                            let edge_b = (ci + b_off.x, cj + b_off.y, ck + b_off.z);
                            let corner_cell = (ci + a_off.x + b_off.x, cj + a_off.y + b_off.y, ck + a_off.z + b_off.z);

                            let a_opaque = !registry.is_transparent(get_comp(edge_a.0, edge_a.1, edge_a.2));
                            let b_opaque = !registry.is_transparent(get_comp(edge_b.0, edge_b.1, edge_b.2));
                            let corner_opaque = !registry.is_transparent(get_comp(corner_cell.0, corner_cell.1, corner_cell.2));

                            ao[quad_index] = if a_opaque && b_opaque {
                                3
                            } else {
                                a_opaque as u32 + b_opaque as u32 + corner_opaque as u32
                            };
                        }
                    }

                    let texture = registry.properties(block_type).textures.for_direction(face);
                    draw.add_quad(block_index, face, texture, sunlight, ao);
                }

                if any_face {
                    draw.add_voxel(block_index, enabled_faces, base_vertex_for_voxel);
                }
            }
        }
    }

    (opaque, transparent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::BlockArrayBox;
    use crate::block::{BlockProperties, FaceTextures};
    use std::sync::Arc;

    fn stone_registry() -> (BlockRegistry, BlockType) {
        let mut r = BlockRegistry::new();
        let stone = r.register(BlockProperties {
            transparent: false,
            collidable: true,
            textures: FaceTextures::Uniform(1),
        });
        (r, stone)
    }

    #[test]
    fn fully_air_chunk_meshes_to_nothing() {
        let edge = 4;
        let (registry, _) = stone_registry();
        let container = ChunkContainer::new(edge);
        let idx = crate::index::GlobalIndex::new(0, 0, 0);
        let chunk = Chunk::new_empty(idx, edge, 15);
        let (opaque, transparent) = mesh_chunk(&container, &chunk, &registry);
        assert!(opaque.vertices.is_empty());
        assert!(transparent.vertices.is_empty());
    }

    #[test]
    fn single_floating_block_emits_all_six_faces() {
        let edge = 4;
        let (registry, stone) = stone_registry();
        let container = ChunkContainer::new(edge);
        let idx = crate::index::GlobalIndex::new(0, 0, 0);

        let mut composition = BlockArrayBox::unallocated(edge, BlockType::AIR);
        composition.set(BlockIndex::new(1, 1, 1), stone);
        let mut chunk = Chunk::new_empty(idx, edge, 15);
        chunk.set_composition(composition, &registry);
        container.insert(idx, Arc::new(parking_lot::RwLock::new(Chunk::new_empty(idx, edge, 15))));

        let (opaque, transparent) = mesh_chunk(&container, &chunk, &registry);
        assert!(transparent.vertices.is_empty());
        assert_eq!(opaque.vertices.len(), 6 * 4);
        assert_eq!(opaque.indices.len(), 6 * 6);
        assert_eq!(opaque.voxels.len(), 1);
        assert!(opaque.voxels[0].enabled_faces.iter().all(|&b| b));
    }

    #[test]
    fn adjacent_identical_blocks_share_no_face() {
        let edge = 4;
        let (registry, stone) = stone_registry();
        let container = ChunkContainer::new(edge);
        let idx = crate::index::GlobalIndex::new(0, 0, 0);

        let mut composition = BlockArrayBox::unallocated(edge, BlockType::AIR);
        composition.set(BlockIndex::new(1, 1, 1), stone);
        composition.set(BlockIndex::new(2, 1, 1), stone);
        let mut chunk = Chunk::new_empty(idx, edge, 15);
        chunk.set_composition(composition, &registry);
        container.insert(idx, Arc::new(parking_lot::RwLock::new(Chunk::new_empty(idx, edge, 15))));

        let (opaque, _) = mesh_chunk(&container, &chunk, &registry);
        // Each block loses exactly the face touching its identical neighbour.
        assert_eq!(opaque.voxels.len(), 2);
        for voxel in &opaque.voxels {
            let enabled_count = voxel.enabled_faces.iter().filter(|&&b| b).count();
            assert_eq!(enabled_count, 5);
        }
    }
}
