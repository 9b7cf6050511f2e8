//! Voxel data structures and world access

pub mod block;
pub mod chunk;
pub mod coords;
pub mod request;
pub mod world;

pub use block::{BlockType, AIR_ID};
pub use chunk::{Chunk, ChunkCoord, CHUNK_SIZE, CHUNK_VOLUME};
pub use coords::{LocalPos, block_to_chunk, chunk_to_block, to_chunk_coordinate, to_global_coordinate, to_local_offset};
pub use request::RequestLevel;
pub use world::{BlockLookup, EditOutcome, World, MAX_WORLD_HEIGHT, MAX_WORLD_HEIGHT_IN_CHUNKS};
