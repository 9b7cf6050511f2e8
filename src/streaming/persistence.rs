//! Persistent chunk tiers behind the cache

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::disk_io;
use crate::core::Result;
use crate::voxel::chunk::{Chunk, ChunkCoord};

/// Backing storage a provider loads from and saves to.
///
/// Implementations must be safe to call from several threads at once.
pub trait ChunkPersistence: Send + Sync {
    /// Load a persisted chunk. `Ok(None)` if it was never saved.
    fn load(&self, coord: ChunkCoord) -> Result<Option<Chunk>>;

    /// Persist the current contents of a chunk
    fn save(&self, chunk: &Chunk) -> Result<()>;

    /// Whether a chunk has been persisted
    fn contains(&self, coord: ChunkCoord) -> bool;
}

/// Chunks stored as LZ4-compressed files under a directory
pub struct DiskPersistence {
    base_dir: PathBuf,
}

impl DiskPersistence {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl ChunkPersistence for DiskPersistence {
    fn load(&self, coord: ChunkCoord) -> Result<Option<Chunk>> {
        Ok(disk_io::load_chunk(&self.base_dir, coord)?)
    }

    fn save(&self, chunk: &Chunk) -> Result<()> {
        Ok(disk_io::save_chunk(&self.base_dir, chunk)?)
    }

    fn contains(&self, coord: ChunkCoord) -> bool {
        disk_io::chunk_exists(&self.base_dir, coord)
    }
}

/// In-process storage holding the same compressed encoding as the disk
/// backend. Used for throwaway worlds and tests.
#[derive(Default)]
pub struct MemoryPersistence {
    chunks: Mutex<HashMap<ChunkCoord, Vec<u8>>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted chunks
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }
}

impl ChunkPersistence for MemoryPersistence {
    fn load(&self, coord: ChunkCoord) -> Result<Option<Chunk>> {
        let bytes = self.chunks.lock().get(&coord).cloned();
        match bytes {
            Some(bytes) => Ok(Some(disk_io::decompress_chunk(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, chunk: &Chunk) -> Result<()> {
        let bytes = disk_io::compress_chunk(chunk)?;
        self.chunks.lock().insert(chunk.coord, bytes);
        Ok(())
    }

    fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.lock().contains_key(&coord)
    }
}
