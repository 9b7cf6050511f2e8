//! Chunk system for managing cubic regions of block space

use glam::IVec3;
use serde::{Deserialize, Serialize};

use super::block::{BlockType, AIR_ID};
use crate::core::{Error, Result};

/// Edge length of a chunk in blocks (all three axes)
pub const CHUNK_SIZE: usize = 16;

/// Number of block slots in a chunk
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Integer coordinate identifying a chunk in the world grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Global block coordinate of this chunk's minimum corner
    pub fn block_origin(&self) -> IVec3 {
        let size = CHUNK_SIZE as i32;
        IVec3::new(self.x * size, self.y * size, self.z * size)
    }

    /// Largest per-axis distance to `other`, in chunks
    pub fn chebyshev_distance(&self, other: &Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        let dz = self.z.abs_diff(other.z);
        dx.max(dy).max(dz)
    }
}

impl From<ChunkCoord> for IVec3 {
    fn from(coord: ChunkCoord) -> Self {
        IVec3::new(coord.x, coord.y, coord.z)
    }
}

impl From<IVec3> for ChunkCoord {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A cube of `CHUNK_SIZE³` block slots.
///
/// Slots hold raw block ids with `AIR_ID` meaning empty. Every mutation sets
/// the changed flag; the store clears it once the chunk is persisted.
pub struct Chunk {
    /// Coordinate of this chunk in the world grid
    pub coord: ChunkCoord,
    blocks: Box<[u8]>,
    /// Number of non-air slots
    occupied: usize,
    changed: bool,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("coord", &self.coord)
            .field("occupied", &self.occupied)
            .field("changed", &self.changed)
            .finish()
    }
}

#[inline]
fn slot_index(lx: usize, ly: usize, lz: usize) -> usize {
    assert!(
        lx < CHUNK_SIZE && ly < CHUNK_SIZE && lz < CHUNK_SIZE,
        "local block coordinate ({lx}, {ly}, {lz}) outside chunk of size {CHUNK_SIZE}"
    );
    (ly * CHUNK_SIZE + lz) * CHUNK_SIZE + lx
}

impl Chunk {
    /// Create a new all-air chunk at the given coordinate
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: vec![AIR_ID; CHUNK_VOLUME].into_boxed_slice(),
            occupied: 0,
            changed: false,
        }
    }

    /// Rebuild a chunk from raw slot ids (as produced by `raw_blocks`).
    ///
    /// The result is unchanged: it mirrors what is already persisted.
    pub fn from_raw(coord: ChunkCoord, blocks: Vec<u8>) -> Result<Self> {
        if blocks.len() != CHUNK_VOLUME {
            return Err(Error::Serialization(format!(
                "chunk {:?} has {} slots, expected {}",
                coord,
                blocks.len(),
                CHUNK_VOLUME
            )));
        }
        if let Some(&bad) = blocks.iter().find(|&&id| !BlockType::is_valid_id(id)) {
            return Err(Error::Serialization(format!(
                "chunk {:?} contains unknown block id {}",
                coord, bad
            )));
        }

        let occupied = blocks.iter().filter(|&&id| id != AIR_ID).count();
        Ok(Self {
            coord,
            blocks: blocks.into_boxed_slice(),
            occupied,
            changed: false,
        })
    }

    /// Raw slot ids in storage order
    pub fn raw_blocks(&self) -> &[u8] {
        &self.blocks
    }

    /// Block at a local position, `None` for air.
    ///
    /// # Panics
    /// If any local coordinate is outside `[0, CHUNK_SIZE)`.
    pub fn get_block_at(&self, lx: usize, ly: usize, lz: usize) -> Option<BlockType> {
        BlockType::from_id(self.blocks[slot_index(lx, ly, lz)])
    }

    /// Store a block at a local position and mark the chunk changed.
    ///
    /// # Panics
    /// If any local coordinate is outside `[0, CHUNK_SIZE)`.
    pub fn set_block_at(&mut self, lx: usize, ly: usize, lz: usize, block: BlockType) {
        self.write_slot(slot_index(lx, ly, lz), block.id());
    }

    /// Set a local position to air and mark the chunk changed.
    ///
    /// # Panics
    /// If any local coordinate is outside `[0, CHUNK_SIZE)`.
    pub fn clear_block_at(&mut self, lx: usize, ly: usize, lz: usize) {
        self.write_slot(slot_index(lx, ly, lz), AIR_ID);
    }

    fn write_slot(&mut self, index: usize, id: u8) {
        let previous = std::mem::replace(&mut self.blocks[index], id);
        match (previous == AIR_ID, id == AIR_ID) {
            (true, false) => self.occupied += 1,
            (false, true) => self.occupied -= 1,
            _ => {}
        }
        self.changed = true;
    }

    /// Whether the chunk was mutated since the flag was last cleared
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Acknowledge that the current contents are persisted
    pub fn clear_changed_flag(&mut self) {
        self.changed = false;
    }

    /// Mark the chunk as needing persistence without touching any slot
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// True if every slot is air
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Number of non-air slots
    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Highest local Y holding a block in column (lx, lz)
    pub fn highest_block_in_column(&self, lx: usize, lz: usize) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        (0..CHUNK_SIZE)
            .rev()
            .find(|&ly| self.blocks[slot_index(lx, ly, lz)] != AIR_ID)
    }
}
