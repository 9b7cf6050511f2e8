//! LRU cache for resident chunks
//!
//! Provides an LRU (Least Recently Used) cache for managing chunks in memory.
//! When the cache is full, the oldest unused chunk is evicted automatically.
//! The cache only tracks residency; persisting evicted chunks is the
//! provider's job.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::streaming::store::SharedChunk;
use crate::voxel::chunk::ChunkCoord;

/// LRU cache for chunks
///
/// Maintains chunks in memory with automatic eviction of least recently used chunks.
/// Lookups and promotions are O(1), so a block read can touch the cache freely.
pub struct ChunkCache {
    /// Chunks keyed by coordinate, most recently used first
    chunks: LruCache<ChunkCoord, SharedChunk>,
}

impl ChunkCache {
    /// Create a new chunk cache with the given capacity
    ///
    /// # Arguments
    /// * `max_chunks` - Maximum number of chunks to keep in memory (at least 1)
    pub fn new(max_chunks: usize) -> Self {
        let capacity = NonZeroUsize::new(max_chunks).unwrap_or(NonZeroUsize::MIN);
        Self {
            chunks: LruCache::new(capacity),
        }
    }

    /// Get a chunk by coordinate
    ///
    /// Marks this chunk as recently used.
    pub fn get(&mut self, coord: ChunkCoord) -> Option<SharedChunk> {
        self.chunks.get(&coord).cloned()
    }

    /// Insert a chunk into the cache
    ///
    /// If the cache is at capacity, the least recently used chunk is evicted first.
    /// If a chunk with the same coordinate already exists, it is replaced.
    ///
    /// # Returns
    /// The evicted or replaced chunk with its coordinate, if any
    pub fn insert(&mut self, coord: ChunkCoord, chunk: SharedChunk) -> Option<(ChunkCoord, SharedChunk)> {
        self.chunks.push(coord, chunk)
    }

    /// Remove a chunk from the cache
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<SharedChunk> {
        self.chunks.pop(&coord)
    }

    /// Check if the cache contains a chunk (does not touch access order)
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains(&coord)
    }

    /// Get the number of chunks in the cache
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.chunks.cap().get()
    }

    /// Evict the oldest (least recently used) chunk
    pub fn evict_oldest(&mut self) -> Option<(ChunkCoord, SharedChunk)> {
        self.chunks.pop_lru()
    }

    /// Remove and return every chunk farther than `radius` chunks (Chebyshev
    /// distance) from `center`
    pub fn drain_outside(&mut self, center: ChunkCoord, radius: u32) -> Vec<(ChunkCoord, SharedChunk)> {
        let far: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .map(|(coord, _)| *coord)
            .filter(|c| c.chebyshev_distance(&center) > radius)
            .collect();

        far.into_iter()
            .filter_map(|coord| self.remove(coord).map(|chunk| (coord, chunk)))
            .collect()
    }

    /// Remove and return every chunk, oldest first
    pub fn drain_all(&mut self) -> Vec<(ChunkCoord, SharedChunk)> {
        std::iter::from_fn(|| self.chunks.pop_lru()).collect()
    }

    /// Iterate resident chunks without touching access order
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &SharedChunk)> {
        self.chunks.iter()
    }

    /// Get an iterator over all chunk coordinates
    pub fn coords(&self) -> impl Iterator<Item = &ChunkCoord> {
        self.chunks.iter().map(|(coord, _)| coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::Chunk;
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn make_chunk(x: i32, y: i32, z: i32) -> (ChunkCoord, SharedChunk) {
        let coord = ChunkCoord::new(x, y, z);
        (coord, Arc::new(RwLock::new(Chunk::new(coord))))
    }

    fn insert(cache: &mut ChunkCache, x: i32, y: i32, z: i32) -> Option<(ChunkCoord, SharedChunk)> {
        let (coord, chunk) = make_chunk(x, y, z);
        cache.insert(coord, chunk)
    }

    #[test]
    fn test_cache_new() {
        let cache = ChunkCache::new(10);
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = ChunkCache::new(10);
        let (coord, chunk) = make_chunk(1, 2, 3);

        cache.insert(coord, chunk.clone());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(coord));

        let retrieved = cache.get(coord).unwrap();
        assert!(Arc::ptr_eq(&retrieved, &chunk));
        assert_eq!(retrieved.read().coord, coord);
    }

    #[test]
    fn test_cache_insert_replace() {
        let mut cache = ChunkCache::new(10);
        let coord = ChunkCoord::new(1, 2, 3);

        assert!(insert(&mut cache, 1, 2, 3).is_none());
        let replaced = insert(&mut cache, 1, 2, 3);
        assert_eq!(replaced.unwrap().0, coord);
        assert_eq!(cache.len(), 1); // Still only 1 chunk
    }

    #[test]
    fn test_cache_remove() {
        let mut cache = ChunkCache::new(10);
        insert(&mut cache, 1, 2, 3);
        let coord = ChunkCoord::new(1, 2, 3);

        assert!(cache.remove(coord).is_some());
        assert_eq!(cache.len(), 0);
        assert!(!cache.contains(coord));
        assert!(cache.remove(coord).is_none());
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = ChunkCache::new(3);

        insert(&mut cache, 1, 0, 0);
        insert(&mut cache, 2, 0, 0);
        insert(&mut cache, 3, 0, 0);
        assert_eq!(cache.len(), 3);

        // Insert 4th chunk - should evict oldest (1, 0, 0)
        let evicted = insert(&mut cache, 4, 0, 0);
        assert_eq!(evicted.unwrap().0, ChunkCoord::new(1, 0, 0));
        assert_eq!(cache.len(), 3);

        assert!(!cache.contains(ChunkCoord::new(1, 0, 0)));
        assert!(cache.contains(ChunkCoord::new(2, 0, 0)));
        assert!(cache.contains(ChunkCoord::new(3, 0, 0)));
        assert!(cache.contains(ChunkCoord::new(4, 0, 0)));
    }

    #[test]
    fn test_cache_lru_access_order() {
        let mut cache = ChunkCache::new(3);

        insert(&mut cache, 1, 0, 0);
        insert(&mut cache, 2, 0, 0);
        insert(&mut cache, 3, 0, 0);

        // Access chunk (1, 0, 0) to move it to end
        cache.get(ChunkCoord::new(1, 0, 0));

        // Insert 4th chunk - should evict (2, 0, 0) now, not (1, 0, 0)
        let evicted = insert(&mut cache, 4, 0, 0);
        assert_eq!(evicted.unwrap().0, ChunkCoord::new(2, 0, 0));
        assert!(cache.contains(ChunkCoord::new(1, 0, 0)));
    }

    #[test]
    fn test_cache_evict_oldest() {
        let mut cache = ChunkCache::new(10);
        insert(&mut cache, 1, 0, 0);
        insert(&mut cache, 2, 0, 0);

        let evicted = cache.evict_oldest();
        assert_eq!(evicted.unwrap().0, ChunkCoord::new(1, 0, 0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_empty_evict() {
        let mut cache = ChunkCache::new(10);
        assert!(cache.evict_oldest().is_none());
    }

    #[test]
    fn test_cache_drain_outside() {
        let mut cache = ChunkCache::new(10);
        insert(&mut cache, 0, 0, 0);
        insert(&mut cache, 2, 1, -2);
        insert(&mut cache, 3, 0, 0);
        insert(&mut cache, 0, 0, -7);

        let mut drained: Vec<ChunkCoord> = cache
            .drain_outside(ChunkCoord::new(0, 0, 0), 2)
            .into_iter()
            .map(|(c, _)| c)
            .collect();
        drained.sort();

        assert_eq!(drained, vec![ChunkCoord::new(0, 0, -7), ChunkCoord::new(3, 0, 0)]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(ChunkCoord::new(2, 1, -2)));
    }

    #[test]
    fn test_cache_drain_all() {
        let mut cache = ChunkCache::new(10);
        insert(&mut cache, 1, 0, 0);
        insert(&mut cache, 2, 0, 0);

        let drained = cache.drain_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, ChunkCoord::new(1, 0, 0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_zero_capacity_holds_one() {
        let mut cache = ChunkCache::new(0);
        assert_eq!(cache.capacity(), 1);
        insert(&mut cache, 1, 0, 0);
        let evicted = insert(&mut cache, 2, 0, 0);
        assert_eq!(evicted.unwrap().0, ChunkCoord::new(1, 0, 0));
    }

    #[test]
    fn test_cache_large_access_order() {
        let mut cache = ChunkCache::new(1024);
        for x in 0..1024 {
            insert(&mut cache, x, 0, 0);
        }

        // Touch everything except x = 500 in reverse, so 500 becomes the oldest
        for x in (0..1024).rev().filter(|&x| x != 500) {
            assert!(cache.get(ChunkCoord::new(x, 0, 0)).is_some());
        }

        let evicted = insert(&mut cache, 5000, 0, 0);
        assert_eq!(evicted.unwrap().0, ChunkCoord::new(500, 0, 0));
        assert_eq!(cache.len(), 1024);
    }

    #[test]
    fn test_cache_coords_iterator() {
        let mut cache = ChunkCache::new(10);
        insert(&mut cache, 1, 2, 3);
        insert(&mut cache, 4, 5, 6);

        let coords: Vec<_> = cache.coords().copied().collect();
        assert_eq!(coords.len(), 2);
        assert!(coords.contains(&ChunkCoord::new(1, 2, 3)));
        assert!(coords.contains(&ChunkCoord::new(4, 5, 6)));
    }
}
