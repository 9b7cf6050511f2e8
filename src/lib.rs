//! Chunkworld - a chunked voxel volume with tiered chunk acquisition

pub mod core;
pub mod voxel;
pub mod streaming;
pub mod generation;

pub use crate::core::{Error, Result, WorldConfig};
pub use crate::streaming::{ChunkProvider, ChunkStore, SharedChunk};
pub use crate::voxel::{BlockLookup, BlockType, Chunk, ChunkCoord, EditOutcome, RequestLevel, World};
