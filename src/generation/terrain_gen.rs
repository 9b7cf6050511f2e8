//! Noise-based heightmap terrain

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use super::ChunkGenerator;
use crate::voxel::block::BlockType;
use crate::voxel::chunk::{Chunk, ChunkCoord, CHUNK_SIZE};
use crate::voxel::coords::to_global_coordinate;
use crate::voxel::world::MAX_WORLD_HEIGHT;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub scale: f64,        // Horizontal scale (larger = smoother)
    pub base_height: i32,  // Surface height where noise is zero
    pub height_scale: f64, // Maximum deviation from base_height
    pub octaves: usize,    // FBM octaves (detail levels)
    pub persistence: f64,  // FBM persistence (0.5 typical)
    pub lacunarity: f64,   // FBM lacunarity (2.0 typical)
    pub sea_level: i32,    // Empty space at or below this is water
    pub soil_depth: i32,   // Dirt layers between stone and surface
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            scale: 120.0,
            base_height: 64,
            height_scale: 40.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            sea_level: 60,
            soil_depth: 3,
        }
    }
}

/// Procedural terrain generator using fractal Brownian motion (FBM)
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given parameters
    pub fn new(seed: u32, params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(params.octaves)
            .set_persistence(params.persistence)
            .set_lacunarity(params.lacunarity);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Global Y of the surface block in column (x, z)
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let nx = x as f64 / self.params.scale;
        let nz = z as f64 / self.params.scale;
        let offset = self.noise.get([nx, nz]) * self.params.height_scale;
        let height = self.params.base_height + offset.round() as i32;
        height.clamp(1, MAX_WORLD_HEIGHT - 1)
    }

    fn block_at(&self, y: i32, surface: i32) -> Option<BlockType> {
        let beach = surface <= self.params.sea_level + 1;
        if y == 0 {
            Some(BlockType::Bedrock)
        } else if y < surface - self.params.soil_depth {
            Some(BlockType::Stone)
        } else if y < surface {
            Some(if beach { BlockType::Sand } else { BlockType::Dirt })
        } else if y == surface {
            Some(if beach { BlockType::Sand } else { BlockType::Grass })
        } else if y <= self.params.sea_level {
            Some(BlockType::Water)
        } else {
            None
        }
    }
}

impl ChunkGenerator for TerrainGenerator {
    fn generate(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord);
        let origin = coord.block_origin();

        if (0..MAX_WORLD_HEIGHT).contains(&origin.y) {
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    let surface = self.height_at(origin.x + lx as i32, origin.z + lz as i32);
                    for ly in 0..CHUNK_SIZE {
                        if let Some(block) = self.block_at(to_global_coordinate(coord.y, ly), surface) {
                            chunk.set_block_at(lx, ly, lz, block);
                        }
                    }
                }
            }
        }

        log::debug!("Generated chunk {:?} ({} blocks)", coord, chunk.occupied_count());
        chunk.mark_changed();
        chunk
    }
}
