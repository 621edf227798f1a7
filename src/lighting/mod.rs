//! Bucketed BFS sunlight propagation.
//!
//! Runs over a one-cell halo gathered from the 3x3x3 chunk neighbourhood:
//! vertical seeding walks sunlight down open columns, the depth each column
//! reaches attenuates into its four lateral neighbours, boundary light
//! already computed in loaded neighbours is absorbed, and the whole thing
//! floods outward one intensity bucket at a time.

use std::collections::HashSet;

use crate::arrays::{BlockArrayBox, BlockBox};
use crate::block::BlockRegistry;
use crate::chunk::{BlockLight, Chunk};
use crate::container::ChunkContainer;
use crate::index::{Direction, GlobalIndex};

/// Light lost per BFS hop. The source's `attenuation` constant.
const ATTENUATION: i32 = 1;

/// A box one cell wider than the chunk on every side, indexed by
/// chunk-relative coordinates in `[-1, edge]`.
struct Halo<T> {
    values: BlockArrayBox<T>,
}

impl<T: Copy + PartialEq> Halo<T> {
    fn get(&self, i: i32, j: i32, k: i32) -> T {
        self.values.get(crate::index::BlockIndex::new(i + 1, j + 1, k + 1))
    }

    fn set(&mut self, i: i32, j: i32, k: i32, v: T) {
        self.values.set(crate::index::BlockIndex::new(i + 1, j + 1, k + 1), v);
    }
}

/// Recomputes `chunk`'s lighting from its own and its neighbours' current
/// composition and lighting. Returns the new array (unallocated when every
/// cell is at `max_sunlight`) and the set of neighbouring chunks whose own
/// lighting must be re-run as a result (diffed per the 26-piece boundary
/// decomposition of the chunk's bounds; the chunk never needs to re-notify
/// itself).
pub fn update_lighting(container: &ChunkContainer, chunk: &Chunk, registry: &BlockRegistry) -> (BlockArrayBox<BlockLight>, Vec<GlobalIndex>) {
    let edge = chunk.edge();
    let max_sunlight = chunk.max_sunlight();
    let halo_box = [BlockBox::new((-1, -1, -1), (edge + 1, edge + 1, edge + 1))];

    let (composition_raw, _) = container.retrieve_type_data(chunk, &halo_box);
    let (lighting_raw, _) = container.retrieve_lighting_data(chunk, &halo_box, max_sunlight);

    let composition = Halo { values: composition_raw };
    let mut lighting = Halo { values: lighting_raw };
    let transparent = |i: i32, j: i32, k: i32| registry.is_transparent(composition.get(i, j, k));

    // Step 1: walk sunlight down every open column until it hits an opaque
    // block (or the chunk floor), recording how deep each column reached and
    // propagating the shallowest reach onto its four lateral neighbours.
    let mut attenuated_depth = vec![edge; (edge * edge) as usize];
    for i in 0..edge {
        for j in 0..edge {
            if lighting.get(i, j, edge) != max_sunlight {
                continue;
            }
            let mut k = edge - 1;
            let mut depth = 0;
            loop {
                if k < 0 {
                    depth = 0;
                    break;
                }
                if !transparent(i, j, k) {
                    depth = k + 1;
                    break;
                }
                lighting.set(i, j, k, max_sunlight);
                k -= 1;
            }

            let mut propagate = |ii: i32, jj: i32| {
                let idx = (ii * edge + jj) as usize;
                attenuated_depth[idx] = attenuated_depth[idx].min(depth);
            };
            if j >= 1 {
                propagate(i, j - 1);
            }
            if j + 1 < edge {
                propagate(i, j + 1);
            }
            if i >= 1 {
                propagate(i - 1, j);
            }
            if i + 1 < edge {
                propagate(i + 1, j);
            }
        }
    }

    // Step 2: seed attenuated sunlight into every unlit open cell from each
    // column's recorded depth up to the chunk's top, and queue it for flood
    // fill.
    let max_level = max_sunlight as i32;
    let mut buckets: Vec<Vec<(i32, i32, i32)>> = (0..=max_level).map(|_| Vec::new()).collect();
    let attenuated_intensity = (max_level - ATTENUATION).max(0);
    for i in 0..edge {
        for j in 0..edge {
            let mut k = attenuated_depth[(i * edge + j) as usize];
            while k < edge {
                if transparent(i, j, k) && lighting.get(i, j, k) != max_sunlight {
                    lighting.set(i, j, k, attenuated_intensity as BlockLight);
                    buckets[attenuated_intensity as usize].push((i, j, k));
                }
                k += 1;
            }
        }
    }

    // Step 3: absorb already-known light standing just outside each
    // non-Top face (Top was handled by the vertical seeding above).
    for d in Direction::ALL {
        if d == Direction::Top {
            continue;
        }
        for (i, j, k) in boundary_layer(d, edge) {
            if transparent(i, j, k) {
                let level = lighting.get(i, j, k) as usize;
                buckets[level].push((i, j, k));
            }
        }
    }

    // Step 4: bucketed BFS flood fill, brightest first. Expansion only
    // writes cells strictly inside the chunk; halo sources contribute light
    // without ever being mutated themselves.
    let mut intensity = max_level;
    while intensity > 0 {
        while let Some((i, j, k)) = buckets[intensity as usize].pop() {
            for d in Direction::ALL {
                let o = d.offset();
                let (ni, nj, nk) = (i + o.x, j + o.y, k + o.z);
                if !(0..edge).contains(&ni) || !(0..edge).contains(&nj) || !(0..edge).contains(&nk) {
                    continue;
                }
                if !transparent(ni, nj, nk) {
                    continue;
                }
                let neighbor_intensity = intensity - ATTENUATION;
                if neighbor_intensity <= lighting.get(ni, nj, nk) as i32 {
                    continue;
                }
                lighting.set(ni, nj, nk, neighbor_intensity as BlockLight);
                buckets[neighbor_intensity as usize].push((ni, nj, nk));
            }
        }
        intensity -= 1;
    }

    let mut values = Vec::with_capacity((edge * edge * edge) as usize);
    for i in 0..edge {
        for j in 0..edge {
            for k in 0..edge {
                values.push(lighting.get(i, j, k));
            }
        }
    }
    let mut new_lighting = BlockArrayBox::allocated(edge, max_sunlight, values);
    new_lighting.compact();

    let affected = notify_affected_neighbors(chunk, &new_lighting, edge);
    (new_lighting, affected)
}

/// The cells one layer outside the chunk on face `d`, in chunk-relative
/// (possibly out-of-`[0,edge)`) coordinates.
fn boundary_layer(d: Direction, edge: i32) -> Vec<(i32, i32, i32)> {
    let mut out = Vec::with_capacity((edge * edge) as usize);
    match d {
        Direction::West => {
            for j in 0..edge {
                for k in 0..edge {
                    out.push((-1, j, k));
                }
            }
        }
        Direction::East => {
            for j in 0..edge {
                for k in 0..edge {
                    out.push((edge, j, k));
                }
            }
        }
        Direction::South => {
            for i in 0..edge {
                for k in 0..edge {
                    out.push((i, -1, k));
                }
            }
        }
        Direction::North => {
            for i in 0..edge {
                for k in 0..edge {
                    out.push((i, edge, k));
                }
            }
        }
        Direction::Bottom => {
            for i in 0..edge {
                for j in 0..edge {
                    out.push((i, j, -1));
                }
            }
        }
        Direction::Top => {
            for i in 0..edge {
                for j in 0..edge {
                    out.push((i, j, edge));
                }
            }
        }
    }
    out
}

fn axis_range(d: i32, edge: i32) -> (i32, i32) {
    match d {
        -1 => (0, 1),
        1 => (edge - 1, edge),
        _ => (0, edge),
    }
}

/// Diffs old vs. new lighting across the 26 pieces of the chunk's boundary
/// shell; any piece that changed means the neighbour(s) on that side need to
/// re-run their own lighting pass.
fn notify_affected_neighbors(chunk: &Chunk, new_lighting: &BlockArrayBox<BlockLight>, edge: i32) -> Vec<GlobalIndex> {
    let old_lighting = chunk.lighting();
    let chunk_index = chunk.index();
    let mut affected = HashSet::new();

    for dk in -1..=1 {
        for dj in -1..=1 {
            for di in -1..=1 {
                if (di, dj, dk) == (0, 0, 0) {
                    continue;
                }
                let (imin, imax) = axis_range(di, edge);
                let (jmin, jmax) = axis_range(dj, edge);
                let (kmin, kmax) = axis_range(dk, edge);
                let mut differs = false;
                'section: for i in imin..imax {
                    for j in jmin..jmax {
                        for k in kmin..kmax {
                            let idx = crate::index::BlockIndex::new(i, j, k);
                            if old_lighting.get(idx) != new_lighting.get(idx) {
                                differs = true;
                                break 'section;
                            }
                        }
                    }
                }
                if differs {
                    affected.insert(GlobalIndex::new(chunk_index.i() + di, chunk_index.j() + dj, chunk_index.k() + dk));
                }
            }
        }
    }
    affected.remove(&chunk_index);
    affected.into_iter().collect()
}
