//! Chunk serialization and disk I/O

use rkyv::{Archive, Deserialize, Serialize};
use rkyv::util::AlignedVec;
use std::io;
use std::path::{Path, PathBuf};

use crate::voxel::chunk::{Chunk, ChunkCoord};

/// Bumped whenever `ChunkData` changes shape
pub const CHUNK_FORMAT_VERSION: u32 = 1;

/// File extension for chunk files
pub const CHUNK_EXTENSION: &str = "chk";

/// Serializable chunk data
#[derive(Archive, Deserialize, Serialize)]
pub struct ChunkData {
    pub version: u32,
    pub coord_x: i32,
    pub coord_y: i32,
    pub coord_z: i32,
    /// Raw slot ids in chunk storage order
    pub blocks: Vec<u8>,
}

/// Serialize a chunk to bytes (uncompressed)
pub fn serialize_chunk(chunk: &Chunk) -> Result<Vec<u8>, io::Error> {
    let data = ChunkData {
        version: CHUNK_FORMAT_VERSION,
        coord_x: chunk.coord.x,
        coord_y: chunk.coord.y,
        coord_z: chunk.coord.z,
        blocks: chunk.raw_blocks().to_vec(),
    };

    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok(bytes.to_vec())
}

/// Deserialize a chunk from bytes (uncompressed)
pub fn deserialize_chunk(data: &[u8]) -> Result<Chunk, io::Error> {
    // Archived data must be aligned before validation
    let mut aligned = AlignedVec::<16>::with_capacity(data.len());
    aligned.extend_from_slice(data);

    let archived = rkyv::access::<ArchivedChunkData, rkyv::rancor::Error>(&aligned)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    let chunk_data: ChunkData = rkyv::deserialize::<ChunkData, rkyv::rancor::Error>(archived)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

    if chunk_data.version != CHUNK_FORMAT_VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unsupported chunk format version: {}", chunk_data.version),
        ));
    }

    let coord = ChunkCoord::new(chunk_data.coord_x, chunk_data.coord_y, chunk_data.coord_z);
    Chunk::from_raw(coord, chunk_data.blocks)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
}

/// Compress a serialized chunk using LZ4
pub fn compress_chunk(chunk: &Chunk) -> Result<Vec<u8>, io::Error> {
    let serialized = serialize_chunk(chunk)?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Decompress and deserialize a chunk
pub fn decompress_chunk(data: &[u8]) -> Result<Chunk, io::Error> {
    let decompressed = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("LZ4 decompression failed: {}", e)))?;
    deserialize_chunk(&decompressed)
}

/// Get the file path for a chunk
pub fn chunk_path(base_dir: &Path, coord: ChunkCoord) -> PathBuf {
    // Group by Y so no single directory collects the whole world
    base_dir
        .join(format!("y_{}", coord.y))
        .join(format!("chunk_{}_{}_{}.{}", coord.x, coord.y, coord.z, CHUNK_EXTENSION))
}

/// Save a chunk to disk (compressed). Writes a temp file and renames it so
/// a crash never leaves a truncated chunk behind.
pub fn save_chunk(base_dir: &Path, chunk: &Chunk) -> Result<(), io::Error> {
    let path = chunk_path(base_dir, chunk.coord);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let compressed = compress_chunk(chunk)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, compressed)?;
    std::fs::rename(&tmp, &path)?;

    Ok(())
}

/// Load a chunk from disk (if it exists)
pub fn load_chunk(base_dir: &Path, coord: ChunkCoord) -> Result<Option<Chunk>, io::Error> {
    let path = chunk_path(base_dir, coord);

    let compressed = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let chunk = decompress_chunk(&compressed)?;

    if chunk.coord != coord {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("File {} holds chunk {:?}", path.display(), chunk.coord),
        ));
    }

    Ok(Some(chunk))
}

/// Check if a chunk exists on disk
pub fn chunk_exists(base_dir: &Path, coord: ChunkCoord) -> bool {
    chunk_path(base_dir, coord).exists()
}
