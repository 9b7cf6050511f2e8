//! Tiered chunk provider: cache, persistence, generation
//!
//! `ChunkProvider` is the default `ChunkStore`. Resident chunks live in an
//! LRU `ChunkCache`; misses fall through to a `ChunkPersistence` backend and
//! then to a `ChunkGenerator`. Every coordinate has at most one
//! materialization in flight; concurrent callers for the same coordinate
//! wait on a condvar and then share the result.
//!
//! Lock order is `inflight` then `cache`. Chunk locks are never held while
//! taking either.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex, RwLock};

use super::cache::ChunkCache;
use super::chunk_loader::{ChunkLoader, LoadResult};
use super::persistence::{ChunkPersistence, DiskPersistence, MemoryPersistence};
use super::store::{ChunkStore, SharedChunk};
use crate::core::{Result, WorldConfig};
use crate::generation::ChunkGenerator;
use crate::voxel::chunk::{Chunk, ChunkCoord};
use crate::voxel::request::RequestLevel;

/// Default number of resident chunks
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Default number of concurrent prefetch loads
pub const DEFAULT_PREFETCH_CONCURRENCY: usize = 4;

/// Snapshot of provider counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub loaded: u64,
    pub generated: u64,
    pub created_empty: u64,
    pub prefetched: u64,
    pub evicted: u64,
    pub saved: u64,
    pub save_failures: u64,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    loaded: AtomicU64,
    generated: AtomicU64,
    created_empty: AtomicU64,
    prefetched: AtomicU64,
    evicted: AtomicU64,
    saved: AtomicU64,
    save_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ProviderStats {
        ProviderStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
            created_empty: self.created_empty.load(Ordering::Relaxed),
            prefetched: self.prefetched.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
        }
    }
}

/// Coordinates claimed in the in-flight set. Released on drop, so a
/// panicking generator cannot wedge waiters.
struct InflightClaim<'a> {
    provider: &'a ChunkProvider,
    coords: Vec<ChunkCoord>,
}

impl Drop for InflightClaim<'_> {
    fn drop(&mut self) {
        if self.coords.is_empty() {
            return;
        }
        let mut inflight = self.provider.inflight.lock();
        for coord in &self.coords {
            inflight.remove(coord);
        }
        drop(inflight);
        self.provider.inflight_done.notify_all();
    }
}

enum Claim<'a> {
    Resident(SharedChunk),
    Claimed(InflightClaim<'a>),
}

/// Default chunk store
pub struct ChunkProvider {
    cache: Mutex<ChunkCache>,
    inflight: Mutex<HashSet<ChunkCoord>>,
    inflight_done: Condvar,
    persistence: Arc<dyn ChunkPersistence>,
    generator: Arc<dyn ChunkGenerator>,
    /// Started on first prefetch
    loader: Mutex<Option<ChunkLoader>>,
    prefetch_concurrency: usize,
    counters: Counters,
}

impl ChunkProvider {
    pub fn new(persistence: Arc<dyn ChunkPersistence>, generator: Arc<dyn ChunkGenerator>, cache_capacity: usize) -> Self {
        Self {
            cache: Mutex::new(ChunkCache::new(cache_capacity)),
            inflight: Mutex::new(HashSet::new()),
            inflight_done: Condvar::new(),
            persistence,
            generator,
            loader: Mutex::new(None),
            prefetch_concurrency: DEFAULT_PREFETCH_CONCURRENCY,
            counters: Counters::default(),
        }
    }

    /// Set how many prefetch loads may run at once
    pub fn with_prefetch_concurrency(mut self, concurrency: usize) -> Self {
        self.prefetch_concurrency = concurrency.max(1);
        self
    }

    /// Build persistence and generator from configuration. No storage
    /// directory means an in-memory world.
    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        let persistence: Arc<dyn ChunkPersistence> = match &config.storage_dir {
            Some(dir) => Arc::new(DiskPersistence::new(dir)?),
            None => Arc::new(MemoryPersistence::new()),
        };
        let generator = config.generation.build(config.seed);

        Ok(Self::new(persistence, generator, config.cache_capacity)
            .with_prefetch_concurrency(config.prefetch_concurrency))
    }

    pub fn persistence(&self) -> &Arc<dyn ChunkPersistence> {
        &self.persistence
    }

    /// Number of resident chunks
    pub fn resident_count(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_resident(&self, coord: ChunkCoord) -> bool {
        self.cache.lock().contains(coord)
    }

    pub fn stats(&self) -> ProviderStats {
        self.counters.snapshot()
    }

    /// Persist every changed resident chunk and clear its flag.
    ///
    /// Returns the number of chunks written. Stops at the first failure.
    pub fn save_changed(&self) -> Result<usize> {
        let resident: Vec<SharedChunk> = self.cache.lock().iter().map(|(_, chunk)| chunk.clone()).collect();

        let mut saved = 0;
        for chunk in resident {
            let mut guard = chunk.write();
            if !guard.is_changed() {
                continue;
            }
            self.persistence.save(&guard)?;
            guard.clear_changed_flag();
            Counters::bump(&self.counters.saved);
            saved += 1;
        }

        if saved > 0 {
            log::debug!("Saved {} changed chunks", saved);
        }
        Ok(saved)
    }

    /// Queue a background load of a persisted chunk.
    ///
    /// Returns `false` if the chunk is already resident, being materialized,
    /// or already queued. Prefetch never generates.
    pub fn prefetch(&self, coord: ChunkCoord, priority: f32) -> Result<bool> {
        if self.inflight.lock().contains(&coord) || self.is_resident(coord) {
            return Ok(false);
        }

        let mut loader = self.loader.lock();
        if loader.is_none() {
            log::debug!("Starting chunk prefetcher ({} concurrent loads)", self.prefetch_concurrency);
            *loader = Some(ChunkLoader::new(self.persistence.clone(), self.prefetch_concurrency)?);
        }
        match loader.as_mut() {
            Some(loader) => loader.request(coord, priority),
            None => Ok(false),
        }
    }

    /// Number of prefetches not yet polled
    pub fn pending_prefetches(&self) -> usize {
        self.loader.lock().as_ref().map_or(0, ChunkLoader::pending_count)
    }

    /// Install finished prefetches into the cache.
    ///
    /// Chunks that became resident in the meantime are left alone. Returns
    /// the number of chunks installed.
    pub fn poll_prefetched(&self) -> usize {
        let results = match self.loader.lock().as_mut() {
            Some(loader) => loader.poll_results(),
            None => return 0,
        };

        let mut installed = 0;
        for result in results {
            match result {
                LoadResult::Loaded(chunk) => {
                    let coord = chunk.coord;
                    let claim = {
                        let mut inflight = self.inflight.lock();
                        let mut cache = self.cache.lock();
                        if inflight.contains(&coord) || cache.contains(coord) {
                            continue;
                        }
                        let evicted = cache.insert(coord, Arc::new(RwLock::new(chunk)));
                        self.claim_evicted(&mut inflight, evicted.into_iter().collect())
                    };
                    self.persist_evicted(claim);
                    Counters::bump(&self.counters.prefetched);
                    installed += 1;
                }
                LoadResult::NotFound(coord) => {
                    log::trace!("Prefetch of {:?} found nothing persisted", coord);
                }
                LoadResult::Error(coord, e) => {
                    log::warn!("Prefetch of {:?} failed: {}", coord, e);
                }
            }
        }
        installed
    }

    /// Wait until nobody is materializing `coord`, then either return the
    /// resident chunk or claim the coordinate.
    fn claim_or_resident(&self, coord: ChunkCoord) -> Claim<'_> {
        let mut inflight = self.inflight.lock();
        while inflight.contains(&coord) {
            self.inflight_done.wait(&mut inflight);
        }
        if let Some(chunk) = self.cache.lock().get(coord) {
            return Claim::Resident(chunk);
        }
        inflight.insert(coord);
        Claim::Claimed(InflightClaim { provider: self, coords: vec![coord] })
    }

    /// Mark evicted chunks in flight so nobody reloads a stale copy from
    /// persistence before they are written back
    fn claim_evicted(
        &self,
        inflight: &mut HashSet<ChunkCoord>,
        evicted: Vec<(ChunkCoord, SharedChunk)>,
    ) -> (InflightClaim<'_>, Vec<SharedChunk>) {
        let mut coords = Vec::with_capacity(evicted.len());
        let mut chunks = Vec::with_capacity(evicted.len());
        for (coord, chunk) in evicted {
            inflight.insert(coord);
            coords.push(coord);
            chunks.push(chunk);
        }
        (InflightClaim { provider: self, coords }, chunks)
    }

    /// Write back changed evicted chunks, then release their claim
    fn persist_evicted(&self, (claim, chunks): (InflightClaim<'_>, Vec<SharedChunk>)) {
        if claim.coords.is_empty() {
            return;
        }

        if let Some(loader) = self.loader.lock().as_mut() {
            for coord in &claim.coords {
                loader.cancel(*coord);
            }
        }

        for chunk in chunks {
            let mut guard = chunk.write();
            Counters::bump(&self.counters.evicted);
            if !guard.is_changed() {
                continue;
            }
            match self.persistence.save(&guard) {
                Ok(()) => {
                    guard.clear_changed_flag();
                    Counters::bump(&self.counters.saved);
                }
                Err(e) => {
                    Counters::bump(&self.counters.save_failures);
                    log::error!("Failed to persist evicted chunk {:?}: {}", guard.coord, e);
                }
            }
        }
        drop(claim);
    }

    fn materialize(&self, coord: ChunkCoord, level: RequestLevel, create: bool) -> Result<Option<SharedChunk>> {
        let chunk = match self.persistence.load(coord)? {
            Some(chunk) => {
                Counters::bump(&self.counters.loaded);
                chunk
            }
            None if !create => return Ok(None),
            None if level.allows_generate() => {
                let mut chunk = self.generator.generate(coord);
                chunk.mark_changed();
                Counters::bump(&self.counters.generated);
                log::trace!("Generated chunk {:?}", coord);
                chunk
            }
            None => {
                Counters::bump(&self.counters.created_empty);
                Chunk::new(coord)
            }
        };

        let shared = Arc::new(RwLock::new(chunk));
        let evicted = {
            let mut inflight = self.inflight.lock();
            let evicted = self.cache.lock().insert(coord, shared.clone());
            self.claim_evicted(&mut inflight, evicted.into_iter().collect())
        };
        self.persist_evicted(evicted);

        Ok(Some(shared))
    }
}

impl ChunkStore for ChunkProvider {
    fn acquire(&self, coord: ChunkCoord, level: RequestLevel, create: bool) -> Result<Option<SharedChunk>> {
        if let Some(chunk) = self.cache.lock().get(coord) {
            Counters::bump(&self.counters.cache_hits);
            return Ok(Some(chunk));
        }
        Counters::bump(&self.counters.cache_misses);

        if !level.allows_load() {
            return Ok(None);
        }

        let _claim = match self.claim_or_resident(coord) {
            Claim::Claimed(claim) => claim,
            Claim::Resident(chunk) => return Ok(Some(chunk)),
        };
        self.materialize(coord, level, create)
    }

    fn has_changed(&self, chunk: &Chunk) -> bool {
        chunk.is_changed()
    }

    fn request_eviction(&self, center: ChunkCoord, radius_in_chunks: u32) {
        let evicted = {
            let mut inflight = self.inflight.lock();
            let drained = self.cache.lock().drain_outside(center, radius_in_chunks);
            self.claim_evicted(&mut inflight, drained)
        };
        let count = evicted.1.len();
        self.persist_evicted(evicted);
        if count > 0 {
            log::debug!("Evicted {} chunks outside radius {} of {:?}", count, radius_in_chunks, center);
        }
    }

    fn shutdown(&self) -> Result<()> {
        self.loader.lock().take();

        let saved = self.save_changed()?;
        let evicted = {
            let mut inflight = self.inflight.lock();
            let drained = self.cache.lock().drain_all();
            self.claim_evicted(&mut inflight, drained)
        };
        self.persist_evicted(evicted);

        let stats = self.stats();
        log::info!(
            "Chunk provider shut down: {} saved on exit, {} loaded, {} generated, {} hits / {} misses",
            saved,
            stats.loaded,
            stats.generated,
            stats.cache_hits,
            stats.cache_misses
        );
        Ok(())
    }
}
