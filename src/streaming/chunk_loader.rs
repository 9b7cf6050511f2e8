//! Background chunk prefetching with priority-based concurrent loading

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::core::{Error, Result};
use crate::streaming::persistence::ChunkPersistence;
use crate::voxel::chunk::{Chunk, ChunkCoord};

/// Request to load a chunk with priority
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub coord: ChunkCoord,
    /// Higher loads first
    pub priority: f32,
    /// Identifies this request; a re-request of the same chunk gets a new one
    pub ticket: u64,
}

/// Result of a chunk load operation
#[derive(Debug)]
pub enum LoadResult {
    /// Successfully loaded from persistence
    Loaded(Chunk),
    /// Nothing persisted at this coordinate
    NotFound(ChunkCoord),
    /// Error during loading
    Error(ChunkCoord, String),
}

impl LoadResult {
    pub fn coord(&self) -> ChunkCoord {
        match self {
            LoadResult::Loaded(chunk) => chunk.coord,
            LoadResult::NotFound(coord) => *coord,
            LoadResult::Error(coord, _) => *coord,
        }
    }
}

/// Concurrent chunk loader running on its own tokio runtime.
///
/// Loads only persisted chunks; it never generates.
pub struct ChunkLoader {
    /// Channel for sending load requests to the worker task
    request_tx: mpsc::UnboundedSender<LoadRequest>,
    /// Channel for receiving load results, tagged with their request ticket
    result_rx: mpsc::UnboundedReceiver<(u64, LoadResult)>,
    /// Chunks requested and not yet polled, with the live ticket
    pending: HashMap<ChunkCoord, u64>,
    next_ticket: u64,
    runtime: Option<Runtime>,
}

impl ChunkLoader {
    /// Create a new chunk loader
    ///
    /// # Arguments
    /// * `persistence` - Tier chunks are loaded from
    /// * `max_concurrent` - Maximum number of concurrent load operations
    pub fn new(persistence: Arc<dyn ChunkPersistence>, max_concurrent: usize) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<LoadRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<(u64, LoadResult)>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("chunk-loader")
            .enable_time()
            .build()
            .map_err(|e| Error::Streaming(format!("Failed to create loader runtime: {}", e)))?;

        let max_concurrent = max_concurrent.max(1);
        runtime.spawn(async move {
            Self::worker_loop(persistence, max_concurrent, &mut request_rx, result_tx).await;
        });

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashMap::new(),
            next_ticket: 0,
            runtime: Some(runtime),
        })
    }

    /// Worker loop that processes load requests with concurrency control
    async fn worker_loop(
        persistence: Arc<dyn ChunkPersistence>,
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<LoadRequest>,
        result_tx: mpsc::UnboundedSender<(u64, LoadResult)>,
    ) {
        let mut active_tasks = JoinSet::new();
        let mut pending_requests: Vec<LoadRequest> = Vec::new();

        loop {
            tokio::select! {
                Some(request) = request_rx.recv() => {
                    pending_requests.push(request);
                }

                Some(result) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match result {
                        Ok(load_result) => {
                            // Receiver gone means the loader was dropped
                            if result_tx.send(load_result).is_err() {
                                break;
                            }
                        }
                        Err(e) => log::error!("Chunk loader task failed: {}", e),
                    }
                }

                else => {
                    if pending_requests.is_empty() && active_tasks.is_empty() {
                        break;
                    }
                }
            }

            while active_tasks.len() < max_concurrent && !pending_requests.is_empty() {
                // Highest priority last so it pops cheaply
                pending_requests.sort_by(|a, b| a.priority.partial_cmp(&b.priority).unwrap_or(std::cmp::Ordering::Equal));
                let Some(request) = pending_requests.pop() else {
                    break;
                };

                let persistence = persistence.clone();
                active_tasks.spawn(async move {
                    let coord = request.coord;
                    let result = match tokio::task::spawn_blocking(move || persistence.load(coord)).await {
                        Ok(Ok(Some(chunk))) => LoadResult::Loaded(chunk),
                        Ok(Ok(None)) => LoadResult::NotFound(coord),
                        Ok(Err(e)) => LoadResult::Error(coord, e.to_string()),
                        Err(e) => LoadResult::Error(coord, e.to_string()),
                    };
                    (request.ticket, result)
                });
            }
        }

        log::debug!("Chunk loader worker stopped");
    }

    /// Request a chunk to be loaded
    ///
    /// Returns `false` if the chunk is already pending, `true` if the request was queued.
    pub fn request(&mut self, coord: ChunkCoord, priority: f32) -> Result<bool> {
        if self.pending.contains_key(&coord) {
            return Ok(false);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.request_tx
            .send(LoadRequest { coord, priority, ticket })
            .map_err(|_| Error::Streaming("Chunk loader worker stopped".to_string()))?;
        self.pending.insert(coord, ticket);

        Ok(true)
    }

    /// Poll for completed load results (non-blocking)
    ///
    /// Results for cancelled requests are dropped, including when the same
    /// chunk was requested again after the cancel.
    pub fn poll_results(&mut self) -> Vec<LoadResult> {
        let mut results = Vec::new();

        while let Ok((ticket, result)) = self.result_rx.try_recv() {
            let coord = result.coord();
            if self.pending.get(&coord) == Some(&ticket) {
                self.pending.remove(&coord);
                results.push(result);
            } else {
                log::trace!("Discarding stale load result for {:?}", coord);
            }
        }

        results
    }

    /// Get the number of pending load requests
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a specific chunk is currently pending
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }

    /// Cancel a pending load request (best effort)
    ///
    /// A load already running still completes, but its result is discarded
    /// by `poll_results`.
    pub fn cancel(&mut self, coord: ChunkCoord) {
        self.pending.remove(&coord);
    }
}

impl Drop for ChunkLoader {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
