//! Translation between global block coordinates and chunk/local coordinates.
//!
//! All functions are pure. Chunk coordinates use floor division so negative
//! global coordinates land in negative chunks (`-1` is local `15` of chunk
//! `-1`, not local `1` of chunk `0`).

use glam::IVec3;

use super::chunk::{ChunkCoord, CHUNK_SIZE};

const SIZE: i32 = CHUNK_SIZE as i32;

/// Position of a block inside its chunk, each axis in `[0, CHUNK_SIZE)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }
}

/// Chunk index along one axis containing global coordinate `c`
#[inline]
pub fn to_chunk_coordinate(c: i32) -> i32 {
    c.div_euclid(SIZE)
}

/// Offset of global coordinate `c` inside its chunk, always in `[0, CHUNK_SIZE)`
#[inline]
pub fn to_local_offset(c: i32) -> usize {
    c.rem_euclid(SIZE) as usize
}

/// Inverse of the pair above: `chunk * CHUNK_SIZE + local`.
///
/// Exact for every chunk/local pair produced from an `i32` global coordinate.
#[inline]
pub fn to_global_coordinate(chunk: i32, local: usize) -> i32 {
    debug_assert!(local < CHUNK_SIZE);
    chunk * SIZE + local as i32
}

/// Split a global block position into its chunk and in-chunk offset
pub fn block_to_chunk(pos: IVec3) -> (ChunkCoord, LocalPos) {
    let chunk = ChunkCoord::new(
        to_chunk_coordinate(pos.x),
        to_chunk_coordinate(pos.y),
        to_chunk_coordinate(pos.z),
    );
    let local = LocalPos::new(
        to_local_offset(pos.x),
        to_local_offset(pos.y),
        to_local_offset(pos.z),
    );
    (chunk, local)
}

/// Recombine a chunk and in-chunk offset into a global block position
pub fn chunk_to_block(chunk: ChunkCoord, local: LocalPos) -> IVec3 {
    IVec3::new(
        to_global_coordinate(chunk.x, local.x),
        to_global_coordinate(chunk.y, local.y),
        to_global_coordinate(chunk.z, local.z),
    )
}
