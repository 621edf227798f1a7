//! Column-fill terrain generation. The noise implementation behind
//! `elevation` lives outside this crate; this module only consumes the
//! elevation and classification callbacks and performs the per-chunk
//! column fill.

use rayon::prelude::*;

use crate::arrays::BlockArrayBox;
use crate::block::BlockType;
use crate::index::GlobalIndex;

/// A world-space elevation field: deterministic surface height (in world
/// length units) as a function of world-space `(x, y)`. Implemented outside
/// this crate (e.g. backed by `noise`); the core only calls it.
pub trait Elevation: Send + Sync {
    fn elevation(&self, x: f32, y: f32) -> f32;
}

impl<F: Fn(f32, f32) -> f32 + Send + Sync> Elevation for F {
    fn elevation(&self, x: f32, y: f32) -> f32 {
        self(x, y)
    }
}

/// A biome tag, opaque to this module beyond being threaded through to the
/// classifier.
pub type Biome = u8;

/// Classifies a single column cell given its biome, world-space Z, and the
/// column's surface Z.
pub trait BlockClassifier: Send + Sync {
    fn classify(&self, biome: Biome, z: f32, surface_z: f32) -> BlockType;
}

impl<F: Fn(Biome, f32, f32) -> BlockType + Send + Sync> BlockClassifier for F {
    fn classify(&self, biome: Biome, z: f32, surface_z: f32) -> BlockType {
        self(biome, z, surface_z)
    }
}

/// A biome field, sampled once per column.
pub trait BiomeMap: Send + Sync {
    fn biome_at(&self, x: f32, y: f32) -> Biome;
}

impl<F: Fn(f32, f32) -> Biome + Send + Sync> BiomeMap for F {
    fn biome_at(&self, x: f32, y: f32) -> Biome {
        self(x, y)
    }
}

pub struct TerrainGenerator<'a> {
    pub elevation: &'a dyn Elevation,
    pub biomes: &'a dyn BiomeMap,
    pub classifier: &'a dyn BlockClassifier,
    pub edge: i32,
    pub block_len: f32,
}

impl<'a> TerrainGenerator<'a> {
    /// Fills a whole chunk's composition column by column. Returns an
    /// unallocated composition when the result is entirely Air.
    pub fn fill_chunk(&self, chunk_index: GlobalIndex) -> BlockArrayBox<BlockType> {
        let edge = self.edge;
        let mut values = Vec::with_capacity((edge * edge * edge) as usize);
        let mut any_non_air = false;

        // Precompute per-column surface height and biome once, in parallel
        // across columns (the only data-parallel opportunity in a fill:
        // every column is independent, every `k` in it reuses the result).
        let (surfaces, biomes): (Vec<f32>, Vec<Biome>) = (0..edge * edge)
            .into_par_iter()
            .map(|flat| {
                let i = flat / edge;
                let j = flat % edge;
                let world_x = (chunk_index.i() * edge) as f32 * self.block_len + (i as f32 + 0.5) * self.block_len;
                let world_y = (chunk_index.j() * edge) as f32 * self.block_len + (j as f32 + 0.5) * self.block_len;
                (self.elevation.elevation(world_x, world_y), self.biomes.biome_at(world_x, world_y))
            })
            .unzip();

        // Composition array is laid out i-major, matching BlockArrayBox's
        // flatten order (i*e*e + j*e + k); fill in that order directly.
        for i in 0..edge {
            for j in 0..edge {
                let flat = (i * edge + j) as usize;
                let surface_z = surfaces[flat];
                let biome = biomes[flat];
                for k in 0..edge {
                    let z = (chunk_index.k() * edge + k) as f32 * self.block_len;
                    let block = self.classifier.classify(biome, z, surface_z);
                    any_non_air |= !block.is_air();
                    values.push(block);
                }
            }
        }

        if any_non_air {
            BlockArrayBox::allocated(edge, BlockType::AIR, values)
        } else {
            BlockArrayBox::unallocated(edge, BlockType::AIR)
        }
    }
}

/// A reference classifier implementing simple soil-depth banding, useful for
/// tests and as documentation of the intended stratigraphy. `soil_depth` and
/// `surface_depth` are in world-length units, matching `surface_z`'s units.
pub struct LayeredClassifier {
    pub soil_depth: f32,
    pub surface_depth: f32,
    pub stone: BlockType,
    pub soil: BlockType,
    pub surface: BlockType,
}

impl BlockClassifier for LayeredClassifier {
    fn classify(&self, _biome: Biome, z: f32, surface_z: f32) -> BlockType {
        if z >= surface_z {
            BlockType::AIR
        } else if z >= surface_z - self.surface_depth {
            self.surface
        } else if z >= surface_z - self.soil_depth {
            self.soil
        } else {
            self.stone
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BlockIndex;

    fn generator<'a>(elev: &'a dyn Elevation, biomes: &'a dyn BiomeMap, classifier: &'a dyn BlockClassifier) -> TerrainGenerator<'a> {
        TerrainGenerator { elevation: elev, biomes, classifier, edge: 8, block_len: 1.0 }
    }

    #[test]
    fn fully_below_surface_chunk_is_all_stone() {
        let elev = |_x: f32, _y: f32| 1000.0f32;
        let biomes = |_x: f32, _y: f32| 0u8;
        let classifier = LayeredClassifier { soil_depth: 4.0, surface_depth: 1.0, stone: BlockType(1), soil: BlockType(2), surface: BlockType(3) };
        let gen = generator(&elev, &biomes, &classifier);
        let comp = gen.fill_chunk(GlobalIndex::new(0, 0, 0));
        assert!(comp.is_allocated());
        for (_, b) in comp.iter() {
            assert_eq!(b, BlockType(1));
        }
    }

    #[test]
    fn fully_above_surface_chunk_drops_to_unallocated() {
        let elev = |_x: f32, _y: f32| -1000.0f32;
        let biomes = |_x: f32, _y: f32| 0u8;
        let classifier = LayeredClassifier { soil_depth: 4.0, surface_depth: 1.0, stone: BlockType(1), soil: BlockType(2), surface: BlockType(3) };
        let gen = generator(&elev, &biomes, &classifier);
        let comp = gen.fill_chunk(GlobalIndex::new(0, 5, 0));
        assert!(!comp.is_allocated());
    }

    #[test]
    fn column_bands_match_soil_surface_stone_layering() {
        let elev = |_x: f32, _y: f32| 10.0f32;
        let biomes = |_x: f32, _y: f32| 0u8;
        let classifier = LayeredClassifier { soil_depth: 4.0, surface_depth: 1.0, stone: BlockType(1), soil: BlockType(2), surface: BlockType(3) };
        let gen = generator(&elev, &biomes, &classifier);
        let comp = gen.fill_chunk(GlobalIndex::new(0, 0, 0));
        // z=9 is within surface band [10-1, 10) -> surface block.
        assert_eq!(comp.get(BlockIndex::new(0, 0, 9)), BlockType(3));
        // z=6 within soil band [10-4, 10-1) -> soil block.
        assert_eq!(comp.get(BlockIndex::new(0, 0, 6)), BlockType(2));
        // z=0 well below -> stone.
        assert_eq!(comp.get(BlockIndex::new(0, 0, 0)), BlockType(1));
    }
}
