//! Chunk residency: the store contract, caching, persistence and prefetch

pub mod store;
pub mod cache;
pub mod disk_io;
pub mod persistence;
pub mod chunk_loader;
pub mod provider;

pub use store::{ChunkStore, SharedChunk};
pub use cache::ChunkCache;
pub use disk_io::{
    ChunkData, CHUNK_FORMAT_VERSION,
    compress_chunk, decompress_chunk,
    serialize_chunk, deserialize_chunk,
    save_chunk, load_chunk, chunk_exists,
    chunk_path,
};
pub use persistence::{ChunkPersistence, DiskPersistence, MemoryPersistence};
pub use chunk_loader::{ChunkLoader, LoadRequest, LoadResult};
pub use provider::{ChunkProvider, ProviderStats};
