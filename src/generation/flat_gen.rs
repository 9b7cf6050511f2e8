//! Flat layered world generation

use super::ChunkGenerator;
use crate::voxel::block::BlockType;
use crate::voxel::chunk::{Chunk, ChunkCoord, CHUNK_SIZE};
use crate::voxel::coords::to_global_coordinate;

/// Fills global Y in `[0, height)` with `fill`, topped with one layer of `top`
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    height: i32,
    fill: BlockType,
    top: BlockType,
}

impl FlatGenerator {
    pub fn new(height: i32, fill: BlockType, top: BlockType) -> Self {
        Self { height, fill, top }
    }

    fn block_at_y(&self, y: i32) -> Option<BlockType> {
        if y < 0 || y >= self.height {
            None
        } else if y == self.height - 1 {
            Some(self.top)
        } else {
            Some(self.fill)
        }
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord);
        for ly in 0..CHUNK_SIZE {
            let Some(block) = self.block_at_y(to_global_coordinate(coord.y, ly)) else {
                continue;
            };
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    chunk.set_block_at(lx, ly, lz, block);
                }
            }
        }
        chunk.mark_changed();
        chunk
    }
}
