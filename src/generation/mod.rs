//! Procedural chunk generation.
//!
//! Generators are pure functions of (seed, chunk coordinate): two providers
//! built from the same seed produce identical chunks.

pub mod config;
pub mod flat_gen;
pub mod terrain_gen;

pub use config::{GenerationConfig, GeneratorKind};
pub use flat_gen::FlatGenerator;
pub use terrain_gen::{TerrainGenerator, TerrainParams};

use crate::voxel::chunk::{Chunk, ChunkCoord};

/// Produces the initial contents of a chunk that was never persisted
pub trait ChunkGenerator: Send + Sync {
    /// Generate the chunk at `coord`. The result is marked changed so the
    /// store persists it.
    fn generate(&self, coord: ChunkCoord) -> Chunk;
}

/// Generator that leaves every chunk empty
pub struct VoidGenerator;

impl ChunkGenerator for VoidGenerator {
    fn generate(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord);
        chunk.mark_changed();
        chunk
    }
}

/// Fold a 64-bit world seed into the 32-bit seed noise functions take
pub fn noise_seed(seed: i64) -> u32 {
    let bits = seed as u64;
    (bits ^ (bits >> 32)) as u32
}
