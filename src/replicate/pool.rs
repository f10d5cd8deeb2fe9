//! Execution modes for replicate work.

use crate::error::{NullError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A fixed-size pool of worker threads, owned by the caller.
///
/// The threads live as long as the handle; dropping it joins them.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
}

impl WorkerPool {
    /// Create a pool with exactly `n_threads` workers.
    pub fn new(n_threads: usize) -> Result<Self> {
        if n_threads == 0 {
            return Err(NullError::InvalidParameter(
                "Worker pool needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("nullcomm-worker-{}", i))
            .build()
            .map_err(|e| NullError::InvalidParameter(format!("Cannot start worker pool: {}", e)))?;
        Ok(Self { pool })
    }

    /// Create a pool sized to the available cores minus `margin` (at least one).
    pub fn with_reserved(margin: usize) -> Result<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(cores.saturating_sub(margin).max(1))
    }

    /// Number of worker threads.
    pub fn n_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub(crate) fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("n_threads", &self.n_threads())
            .finish()
    }
}

/// Where replicate computations run.
#[derive(Debug, Clone, Copy, Default)]
pub enum Execution<'a> {
    /// One replicate after another on the calling thread.
    #[default]
    Sequential,
    /// Spread over the workers of a caller-owned pool.
    Parallel(&'a WorkerPool),
}

/// Cooperative cancellation flag shared between a caller and running work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Replicates not yet started are skipped.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
