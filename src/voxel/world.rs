//! World façade over a chunk store
//!
//! `World` owns the volume identity (seed, name, random stream), maps global
//! block coordinates onto chunks and delegates residency to a `ChunkStore`.
//! It holds no locks of its own: chunk locks are taken per call and never
//! held across a store call.

use glam::IVec3;
use parking_lot::{Mutex, MutexGuard};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

use super::block::BlockType;
use super::chunk::{Chunk, ChunkCoord, CHUNK_SIZE};
use super::coords::{block_to_chunk, to_chunk_coordinate, to_global_coordinate, to_local_offset};
use super::request::RequestLevel;
use crate::core::{Result, WorldConfig};
use crate::streaming::provider::ChunkProvider;
use crate::streaming::store::{ChunkStore, SharedChunk};

/// Exclusive upper bound of global block Y
pub const MAX_WORLD_HEIGHT: i32 = 256;

/// Exclusive upper bound of chunk Y
pub const MAX_WORLD_HEIGHT_IN_CHUNKS: i32 = MAX_WORLD_HEIGHT / CHUNK_SIZE as i32;

const _: () = assert!(MAX_WORLD_HEIGHT % CHUNK_SIZE as i32 == 0);

/// Result of reading one block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockLookup {
    /// The chunk could not be acquired at the requested level
    Unavailable,
    /// The chunk is there and the slot is empty
    Air,
    /// The chunk is there and the slot holds a block
    Block(BlockType),
}

impl BlockLookup {
    /// The block, if any. Collapses `Unavailable` and `Air` into `None`.
    pub fn block(self) -> Option<BlockType> {
        match self {
            BlockLookup::Block(block) => Some(block),
            _ => None,
        }
    }

    /// Whether the owning chunk was acquired
    pub fn is_available(self) -> bool {
        !matches!(self, BlockLookup::Unavailable)
    }
}

/// Result of a block write
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOutcome {
    /// The chunk was acquired and the slot written
    Applied,
    /// Conditional write found the slot occupied
    Skipped,
    /// The chunk could not be acquired; nothing was written
    ChunkUnavailable,
}

impl EditOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

fn in_height_range(y: i32) -> bool {
    (0..MAX_WORLD_HEIGHT).contains(&y)
}

/// A named, seeded voxel volume backed by one chunk store
pub struct World<S: ChunkStore = ChunkProvider> {
    seed: i64,
    name: String,
    store: S,
    /// Shared reproducible random stream for procedural consumers
    random: Mutex<ChaCha12Rng>,
    exited: bool,
}

impl World<ChunkProvider> {
    /// Build a world and its default provider from configuration
    pub fn open(config: &WorldConfig) -> Result<Self> {
        config.validate()?;
        let provider = ChunkProvider::from_config(config)?;
        log::info!(
            "Opened world '{}' (seed {}, storage {})",
            config.name,
            config.seed,
            config
                .storage_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        );
        Ok(Self::new(config.seed, config.name.clone(), provider))
    }
}

impl<S: ChunkStore> World<S> {
    /// Create a world over an existing store
    pub fn new(seed: i64, name: impl Into<String>, store: S) -> Self {
        Self {
            seed,
            name: name.into(),
            store,
            random: Mutex::new(ChaCha12Rng::seed_from_u64(seed as u64)),
            exited: false,
        }
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Locked access to the world's random stream.
    ///
    /// Draw order determines the sequence; two worlds with the same seed give
    /// the same values for the same sequence of draws.
    /// Chunk generators are seeded from the world seed directly, so generated
    /// content never depends on how this stream has been drawn from.
    pub fn random(&self) -> MutexGuard<'_, ChaCha12Rng> {
        self.random.lock()
    }

    /// Acquire a chunk by chunk coordinate
    pub fn chunk_at(&self, coord: ChunkCoord, level: RequestLevel, create: bool) -> Result<Option<SharedChunk>> {
        self.store.acquire(coord, level, create)
    }

    fn chunk_for_block(&self, pos: IVec3, level: RequestLevel, create: bool) -> Result<Option<(SharedChunk, usize, usize, usize)>> {
        if !in_height_range(pos.y) {
            log::debug!("Block y={} outside world height, treating chunk as unavailable", pos.y);
            return Ok(None);
        }
        let (coord, local) = block_to_chunk(pos);
        Ok(self
            .chunk_at(coord, level, create)?
            .map(|chunk| (chunk, local.x, local.y, local.z)))
    }

    /// Read a block at global coordinates
    pub fn get_block_at(&self, x: i32, y: i32, z: i32, level: RequestLevel, create: bool) -> Result<BlockLookup> {
        let Some((chunk, lx, ly, lz)) = self.chunk_for_block(IVec3::new(x, y, z), level, create)? else {
            return Ok(BlockLookup::Unavailable);
        };
        let block = chunk.read().get_block_at(lx, ly, lz);
        Ok(block.map_or(BlockLookup::Air, BlockLookup::Block))
    }

    /// `get_block_at` taking a position vector
    pub fn get_block_at_pos(&self, pos: IVec3, level: RequestLevel, create: bool) -> Result<BlockLookup> {
        self.get_block_at(pos.x, pos.y, pos.z, level, create)
    }

    /// Cache-only read for read-mostly callers such as renderers
    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Result<Option<BlockType>> {
        Ok(self.get_block_at(x, y, z, RequestLevel::Cache, false)?.block())
    }

    /// Cache-only read taking a position vector
    pub fn block_at_pos(&self, pos: IVec3) -> Result<Option<BlockType>> {
        self.block_at(pos.x, pos.y, pos.z)
    }

    /// Write a block. If the chunk cannot be acquired the write is dropped
    /// and `ChunkUnavailable` is returned.
    pub fn set_block_at(&self, x: i32, y: i32, z: i32, block: BlockType, level: RequestLevel, create: bool) -> Result<EditOutcome> {
        let Some((chunk, lx, ly, lz)) = self.chunk_for_block(IVec3::new(x, y, z), level, create)? else {
            return Ok(EditOutcome::ChunkUnavailable);
        };
        chunk.write().set_block_at(lx, ly, lz, block);
        Ok(EditOutcome::Applied)
    }

    /// Write a block only if the slot is currently air.
    ///
    /// Read and write are separate steps; a concurrent writer can land
    /// between them.
    pub fn set_block_at_if_air(&self, x: i32, y: i32, z: i32, block: BlockType, level: RequestLevel, create: bool) -> Result<EditOutcome> {
        match self.get_block_at(x, y, z, level, create)? {
            BlockLookup::Unavailable => Ok(EditOutcome::ChunkUnavailable),
            BlockLookup::Block(_) => Ok(EditOutcome::Skipped),
            BlockLookup::Air => self.set_block_at(x, y, z, block, level, create),
        }
    }

    /// Set a block to air. Never creates a chunk.
    pub fn clear_block_at(&self, x: i32, y: i32, z: i32, level: RequestLevel) -> Result<EditOutcome> {
        let Some((chunk, lx, ly, lz)) = self.chunk_for_block(IVec3::new(x, y, z), level, false)? else {
            return Ok(EditOutcome::ChunkUnavailable);
        };
        chunk.write().clear_block_at(lx, ly, lz);
        Ok(EditOutcome::Applied)
    }

    /// Highest global Y holding a block in column (x, z), or `None` if the
    /// column has no block in any chunk obtainable at `level`.
    ///
    /// Chunks that cannot be acquired without creating them are skipped.
    pub fn get_highest_y_at(&self, x: i32, z: i32, level: RequestLevel) -> Result<Option<i32>> {
        let chunk_x = to_chunk_coordinate(x);
        let chunk_z = to_chunk_coordinate(z);
        let lx = to_local_offset(x);
        let lz = to_local_offset(z);

        for chunk_y in (0..MAX_WORLD_HEIGHT_IN_CHUNKS).rev() {
            let coord = ChunkCoord::new(chunk_x, chunk_y, chunk_z);
            let Some(chunk) = self.chunk_at(coord, level, false)? else {
                continue;
            };
            if let Some(ly) = chunk.read().highest_block_in_column(lx, lz) {
                return Ok(Some(to_global_coordinate(chunk_y, ly)));
            }
        }
        Ok(None)
    }

    /// `get_highest_y_at` with an empty column reported as `0`.
    ///
    /// `0` is ambiguous with a block at ground level; prefer
    /// `get_highest_y_at` when the difference matters.
    pub fn get_highest_y_or_ground(&self, x: i32, z: i32, level: RequestLevel) -> Result<i32> {
        Ok(self.get_highest_y_at(x, z, level)?.unwrap_or(0))
    }

    /// Whether a chunk holds unpersisted changes
    pub fn has_chunk_changed(&self, chunk: &Chunk) -> bool {
        self.store.has_changed(chunk)
    }

    /// Ask the store to evict chunks farther than `radius_in_chunks` from
    /// the chunk containing global position `center`
    pub fn clear_cache(&self, center: IVec3, radius_in_chunks: u32) {
        let (center_chunk, _) = block_to_chunk(center);
        log::debug!("Cache eviction requested around {:?} (radius {})", center_chunk, radius_in_chunks);
        self.store.request_eviction(center_chunk, radius_in_chunks);
    }

    /// Shut the store down. Consumes the world so it runs exactly once.
    pub fn on_exit(mut self) -> Result<()> {
        self.exited = true;
        log::info!("Closing world '{}'", self.name);
        self.store.shutdown()
    }
}

impl<S: ChunkStore> Drop for World<S> {
    fn drop(&mut self) {
        if !self.exited {
            log::warn!("World '{}' dropped without on_exit; unsaved changes may be lost", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::generation::FlatGenerator;
    use crate::streaming::persistence::{ChunkPersistence, MemoryPersistence};
    use rand::RngCore;
    use std::sync::Arc;

    fn test_world() -> (World, Arc<MemoryPersistence>) {
        let persistence = Arc::new(MemoryPersistence::new());
        let generator = Arc::new(FlatGenerator::new(4, BlockType::Stone, BlockType::Grass));
        let provider = ChunkProvider::new(persistence.clone(), generator, 64);
        (World::new(42, "test", provider), persistence)
    }

    /// Store whose every acquisition fails
    struct BrokenStore;

    impl ChunkStore for BrokenStore {
        fn acquire(&self, _coord: ChunkCoord, _level: RequestLevel, _create: bool) -> Result<Option<SharedChunk>> {
            Err(Error::Storage("disk on fire".to_string()))
        }
        fn has_changed(&self, chunk: &Chunk) -> bool {
            chunk.is_changed()
        }
        fn request_eviction(&self, _center: ChunkCoord, _radius_in_chunks: u32) {}
        fn shutdown(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(MAX_WORLD_HEIGHT_IN_CHUNKS * CHUNK_SIZE as i32, MAX_WORLD_HEIGHT);
    }

    #[test]
    fn test_write_then_cached_read() {
        let (world, _) = test_world();

        let outcome = world.set_block_at(3, 20, -7, BlockType::Dirt, RequestLevel::Load, true).unwrap();
        assert_eq!(outcome, EditOutcome::Applied);

        let lookup = world.get_block_at(3, 20, -7, RequestLevel::Cache, false).unwrap();
        assert_eq!(lookup, BlockLookup::Block(BlockType::Dirt));
        assert_eq!(world.block_at(3, 20, -7).unwrap(), Some(BlockType::Dirt));
        assert_eq!(world.block_at_pos(IVec3::new(3, 20, -7)).unwrap(), Some(BlockType::Dirt));
        world.on_exit().unwrap();
    }

    #[test]
    fn test_negative_coordinates_map_to_distinct_slots() {
        let (world, _) = test_world();

        world.set_block_at(-1, 10, -1, BlockType::Sand, RequestLevel::Load, true).unwrap();
        world.set_block_at(0, 10, 0, BlockType::Gravel, RequestLevel::Load, true).unwrap();
        world.set_block_at(-16, 10, -17, BlockType::Wood, RequestLevel::Load, true).unwrap();

        assert_eq!(world.block_at(-1, 10, -1).unwrap(), Some(BlockType::Sand));
        assert_eq!(world.block_at(0, 10, 0).unwrap(), Some(BlockType::Gravel));
        assert_eq!(world.block_at(-16, 10, -17).unwrap(), Some(BlockType::Wood));
        assert_eq!(world.block_at(15, 10, 15).unwrap(), None);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_lookup_separates_air_from_missing_chunk() {
        let (world, _) = test_world();

        assert_eq!(
            world.get_block_at(0, 0, 0, RequestLevel::Cache, false).unwrap(),
            BlockLookup::Unavailable
        );

        world.set_block_at(0, 0, 0, BlockType::Stone, RequestLevel::Load, true).unwrap();
        assert_eq!(
            world.get_block_at(1, 0, 0, RequestLevel::Cache, false).unwrap(),
            BlockLookup::Air
        );
        world.on_exit().unwrap();
    }

    #[test]
    fn test_write_dropped_when_chunk_absent() {
        let (world, _) = test_world();

        let outcome = world.set_block_at(5, 5, 5, BlockType::Stone, RequestLevel::Cache, false).unwrap();
        assert_eq!(outcome, EditOutcome::ChunkUnavailable);

        // Materializing the chunk afterwards must not reveal the dropped write
        let lookup = world.get_block_at(5, 5, 5, RequestLevel::Load, true).unwrap();
        assert_eq!(lookup, BlockLookup::Air);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_set_if_air_never_overwrites() {
        let (world, _) = test_world();
        world.set_block_at(2, 2, 2, BlockType::Stone, RequestLevel::Load, true).unwrap();

        let outcome = world.set_block_at_if_air(2, 2, 2, BlockType::Water, RequestLevel::Load, true).unwrap();
        assert_eq!(outcome, EditOutcome::Skipped);
        assert_eq!(world.block_at(2, 2, 2).unwrap(), Some(BlockType::Stone));

        let outcome = world.set_block_at_if_air(2, 3, 2, BlockType::Water, RequestLevel::Load, true).unwrap();
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(world.block_at(2, 3, 2).unwrap(), Some(BlockType::Water));

        let outcome = world.set_block_at_if_air(100, 3, 100, BlockType::Water, RequestLevel::Cache, false).unwrap();
        assert_eq!(outcome, EditOutcome::ChunkUnavailable);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (world, _) = test_world();
        world.set_block_at(1, 1, 1, BlockType::Dirt, RequestLevel::Load, true).unwrap();

        assert!(world.clear_block_at(1, 1, 1, RequestLevel::Cache).unwrap().is_applied());
        assert_eq!(world.get_block_at(1, 1, 1, RequestLevel::Cache, false).unwrap(), BlockLookup::Air);

        assert!(world.clear_block_at(1, 1, 1, RequestLevel::Cache).unwrap().is_applied());
        assert_eq!(world.get_block_at(1, 1, 1, RequestLevel::Cache, false).unwrap(), BlockLookup::Air);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_clear_never_creates_chunk() {
        let (world, _) = test_world();

        let outcome = world.clear_block_at(40, 40, 40, RequestLevel::Generate).unwrap();
        assert_eq!(outcome, EditOutcome::ChunkUnavailable);
        assert_eq!(
            world.get_block_at(40, 40, 40, RequestLevel::Cache, false).unwrap(),
            BlockLookup::Unavailable
        );
        world.on_exit().unwrap();
    }

    #[test]
    fn test_highest_y_single_block() {
        let (world, _) = test_world();
        world.set_block_at(0, 5, 0, BlockType::Stone, RequestLevel::Load, true).unwrap();

        assert_eq!(world.get_highest_y_at(0, 0, RequestLevel::Cache).unwrap(), Some(5));
        assert_eq!(world.get_highest_y_or_ground(0, 0, RequestLevel::Cache).unwrap(), 5);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_highest_y_empty_column() {
        let (world, _) = test_world();

        assert_eq!(world.get_highest_y_at(0, 0, RequestLevel::Cache).unwrap(), None);
        assert_eq!(world.get_highest_y_or_ground(0, 0, RequestLevel::Cache).unwrap(), 0);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_highest_y_across_chunks() {
        let (world, _) = test_world();
        world.set_block_at(-3, 5, 9, BlockType::Stone, RequestLevel::Load, true).unwrap();
        world.set_block_at(-3, 200, 9, BlockType::Leaves, RequestLevel::Load, true).unwrap();
        world.set_block_at(-2, 250, 9, BlockType::Leaves, RequestLevel::Load, true).unwrap();

        assert_eq!(world.get_highest_y_at(-3, 9, RequestLevel::Cache).unwrap(), Some(200));
        world.on_exit().unwrap();
    }

    #[test]
    fn test_highest_y_does_not_materialize_chunks() {
        let (world, _) = test_world();

        assert_eq!(world.get_highest_y_at(8, 8, RequestLevel::Generate).unwrap(), None);
        assert_eq!(world.store().resident_count(), 0);
        world.on_exit().unwrap();
    }

    #[test]
    fn test_generate_level_uses_generator() {
        let (world, _) = test_world();

        // Flat generator: ground up to y = 3, grass on top
        let lookup = world.get_block_at(7, 3, 7, RequestLevel::Generate, true).unwrap();
        assert_eq!(lookup, BlockLookup::Block(BlockType::Grass));
        assert_eq!(world.get_highest_y_at(7, 7, RequestLevel::Cache).unwrap(), Some(3));
        world.on_exit().unwrap();
    }

    #[test]
    fn test_out_of_height_is_unavailable() {
        let (world, _) = test_world();

        let outcome = world.set_block_at(0, MAX_WORLD_HEIGHT, 0, BlockType::Stone, RequestLevel::Load, true).unwrap();
        assert_eq!(outcome, EditOutcome::ChunkUnavailable);
        assert_eq!(
            world.get_block_at(0, -1, 0, RequestLevel::Generate, true).unwrap(),
            BlockLookup::Unavailable
        );
        world.on_exit().unwrap();
    }

    #[test]
    fn test_store_errors_propagate() {
        let world = World::new(1, "broken", BrokenStore);

        assert!(matches!(
            world.get_block_at(0, 0, 0, RequestLevel::Load, true),
            Err(Error::Storage(_))
        ));
        assert!(world.set_block_at(0, 0, 0, BlockType::Stone, RequestLevel::Load, true).is_err());
        assert!(world.get_highest_y_at(0, 0, RequestLevel::Cache).is_err());
        world.on_exit().unwrap();
    }

    #[test]
    fn test_random_stream_is_seeded() {
        let a = World::new(1234, "a", BrokenStore);
        let b = World::new(1234, "b", BrokenStore);
        let c = World::new(4321, "c", BrokenStore);

        let seq_a: Vec<u64> = (0..8).map(|_| a.random().next_u64()).collect();
        let seq_b: Vec<u64> = (0..8).map(|_| b.random().next_u64()).collect();
        let seq_c: Vec<u64> = (0..8).map(|_| c.random().next_u64()).collect();

        assert_eq!(seq_a, seq_b);
        assert_ne!(seq_a, seq_c);
        for world in [a, b, c] {
            world.on_exit().unwrap();
        }
    }

    #[test]
    fn test_generation_ignores_random_draws() {
        let config = WorldConfig { seed: 99, ..WorldConfig::default() };
        let drawn = World::open(&config).unwrap();
        let untouched = World::open(&config).unwrap();

        for _ in 0..100 {
            drawn.random().next_u64();
        }

        let coord = ChunkCoord::new(3, 4, -2);
        let a = drawn.chunk_at(coord, RequestLevel::Generate, true).unwrap().unwrap();
        let b = untouched.chunk_at(coord, RequestLevel::Generate, true).unwrap().unwrap();
        assert_eq!(a.read().raw_blocks(), b.read().raw_blocks());
        drop((a, b));

        drawn.on_exit().unwrap();
        untouched.on_exit().unwrap();
    }

    #[test]
    fn test_changed_tracking_and_exit_flush() {
        let (world, persistence) = test_world();
        world.set_block_at(17, 4, 1, BlockType::Gravel, RequestLevel::Load, true).unwrap();

        let coord = ChunkCoord::new(1, 0, 0);
        let chunk = world.chunk_at(coord, RequestLevel::Cache, false).unwrap().unwrap();
        assert!(world.has_chunk_changed(&chunk.read()));
        drop(chunk);

        world.on_exit().unwrap();
        let saved = persistence.load(coord).unwrap().expect("chunk persisted on exit");
        assert_eq!(saved.get_block_at(1, 4, 1), Some(BlockType::Gravel));
    }

    #[test]
    fn test_clear_cache_evicts_far_chunks() {
        let (world, persistence) = test_world();
        world.set_block_at(0, 0, 0, BlockType::Stone, RequestLevel::Load, true).unwrap();
        world.set_block_at(16 * 10, 0, 0, BlockType::Dirt, RequestLevel::Load, true).unwrap();

        world.clear_cache(IVec3::new(1, 1, 1), 2);

        assert_eq!(world.block_at(0, 0, 0).unwrap(), Some(BlockType::Stone));
        assert_eq!(
            world.get_block_at(16 * 10, 0, 0, RequestLevel::Cache, false).unwrap(),
            BlockLookup::Unavailable
        );
        // Evicted chunk was persisted and comes back at Load level
        assert!(persistence.contains(ChunkCoord::new(10, 0, 0)));
        assert_eq!(
            world.get_block_at(16 * 10, 0, 0, RequestLevel::Load, false).unwrap(),
            BlockLookup::Block(BlockType::Dirt)
        );
        world.on_exit().unwrap();
    }
}
