//! Generation configuration

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{noise_seed, ChunkGenerator, FlatGenerator, TerrainGenerator, TerrainParams, VoidGenerator};
use crate::voxel::block::BlockType;

/// Which generator a world uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    #[default]
    Terrain,
    Flat,
    Void,
}

/// Configuration for chunk generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub generator: GeneratorKind,
    /// Terrain noise parameters (terrain generator only)
    pub terrain_params: TerrainParams,
    /// Number of filled layers (flat generator only)
    pub flat_height: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorKind::Terrain,
            terrain_params: TerrainParams::default(),
            flat_height: 4,
        }
    }
}

impl GenerationConfig {
    /// Build the configured generator, seeded from the world seed
    pub fn build(&self, seed: i64) -> Arc<dyn ChunkGenerator> {
        match self.generator {
            GeneratorKind::Terrain => Arc::new(TerrainGenerator::new(noise_seed(seed), self.terrain_params.clone())),
            GeneratorKind::Flat => Arc::new(FlatGenerator::new(self.flat_height, BlockType::Dirt, BlockType::Grass)),
            GeneratorKind::Void => Arc::new(VoidGenerator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkCoord;

    #[test]
    fn test_build_flat() {
        let config = GenerationConfig { generator: GeneratorKind::Flat, flat_height: 2, ..Default::default() };
        let chunk = config.build(0).generate(ChunkCoord::new(0, 0, 0));
        assert_eq!(chunk.get_block_at(0, 1, 0), Some(BlockType::Grass));
        assert_eq!(chunk.get_block_at(0, 2, 0), None);
    }

    #[test]
    fn test_build_terrain_is_seeded() {
        let config = GenerationConfig::default();
        let coord = ChunkCoord::new(0, 3, 0);
        let a = config.build(555).generate(coord);
        let b = config.build(555).generate(coord);
        assert_eq!(a.raw_blocks(), b.raw_blocks());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: GenerationConfig = serde_json::from_str(r#"{"generator": "void"}"#).unwrap();
        assert_eq!(config.generator, GeneratorKind::Void);
        assert_eq!(config.flat_height, 4);
    }
}
