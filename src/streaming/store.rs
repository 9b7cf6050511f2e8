//! The chunk store contract consumed by `World`

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::Result;
use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::request::RequestLevel;

/// A resident chunk shared between the store and its callers.
///
/// Per-chunk discipline is single writer / multiple readers. Callers that
/// mutate the same chunk from several threads must serialize externally.
pub type SharedChunk = Arc<RwLock<Chunk>>;

/// Owner of chunk residency: lookup, load, generation and eviction.
///
/// Concurrency contract:
/// - `acquire` may be called concurrently for different coordinates.
/// - Concurrent `acquire` calls for the same coordinate never load or
///   generate it twice; late callers block until the first one finishes and
///   then see its result.
/// - `acquire` is blocking. `Load`/`Generate` may take I/O or generation time.
pub trait ChunkStore: Send + Sync {
    /// Acquire the chunk at `coord`.
    ///
    /// Returns `Ok(None)` if `level` is `Cache` and the chunk is not resident,
    /// or if `create` is false and the chunk does not exist at any tier the
    /// level allows. Store failures (corrupt data, I/O) are `Err`.
    fn acquire(&self, coord: ChunkCoord, level: RequestLevel, create: bool) -> Result<Option<SharedChunk>>;

    /// Whether the chunk holds changes the store has not yet persisted
    fn has_changed(&self, chunk: &Chunk) -> bool;

    /// Evict resident chunks farther than `radius_in_chunks` from `center`.
    /// Distance metric and persistence on eviction are store policy.
    fn request_eviction(&self, center: ChunkCoord, radius_in_chunks: u32);

    /// Flush and tear down. Called once, before the store is discarded.
    fn shutdown(&self) -> Result<()>;
}

impl<S: ChunkStore + ?Sized> ChunkStore for Arc<S> {
    fn acquire(&self, coord: ChunkCoord, level: RequestLevel, create: bool) -> Result<Option<SharedChunk>> {
        (**self).acquire(coord, level, create)
    }

    fn has_changed(&self, chunk: &Chunk) -> bool {
        (**self).has_changed(chunk)
    }

    fn request_eviction(&self, center: ChunkCoord, radius_in_chunks: u32) {
        (**self).request_eviction(center, radius_in_chunks)
    }

    fn shutdown(&self) -> Result<()> {
        (**self).shutdown()
    }
}
