//! Deterministic replicate execution.
//!
//! Replicate `i` always draws from the stream `replicate_rng(seed, i)`, so a
//! run gives the same numbers whether it executes sequentially or in
//! parallel, and results come back in replicate order either way.

use super::pool::{CancelToken, Execution, WorkerPool};
use crate::error::{NullError, Result};
use rand::{RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// RNG stream for replicate `index` of a run seeded with `seed`.
///
/// The run seed goes through SplitMix64 before the index is mixed in, so
/// runs with neighbouring seeds share no replicate streams.
pub fn replicate_rng(seed: u64, index: usize) -> Xoshiro256PlusPlus {
    let base = SplitMix64::seed_from_u64(seed).next_u64();
    let stream = base ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Xoshiro256PlusPlus::seed_from_u64(stream)
}

/// Execution settings shared by every replicate loop of one analysis call.
#[derive(Debug, Clone, Default)]
pub struct Runtime<'a> {
    pub execution: Execution<'a>,
    pub cancel: Option<CancelToken>,
}

impl<'a> Runtime<'a> {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel(pool: &'a WorkerPool) -> Self {
        Self {
            execution: Execution::Parallel(pool),
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Runner for `n_replicates` draws seeded with `seed` under these settings.
    pub fn runner(&self, n_replicates: usize, seed: u64) -> ReplicateRunner<'a> {
        ReplicateRunner {
            n_replicates,
            seed,
            execution: self.execution,
            cancel: self.cancel.clone(),
        }
    }
}

/// Runs a fixed number of independent replicates.
#[derive(Debug, Clone)]
pub struct ReplicateRunner<'a> {
    n_replicates: usize,
    seed: u64,
    execution: Execution<'a>,
    cancel: Option<CancelToken>,
}

impl<'a> ReplicateRunner<'a> {
    pub fn new(n_replicates: usize, seed: u64) -> Self {
        Self {
            n_replicates,
            seed,
            execution: Execution::Sequential,
            cancel: None,
        }
    }

    pub fn with_execution(mut self, execution: Execution<'a>) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn n_replicates(&self) -> usize {
        self.n_replicates
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Evaluate `task(i, rng_i)` for every replicate `i`.
    ///
    /// The first error aborts the run and no partial results are returned.
    pub fn run<T, F>(&self, task: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &mut Xoshiro256PlusPlus) -> Result<T> + Sync,
    {
        let completed = AtomicUsize::new(0);
        let one = |i: usize| -> Result<T> {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    return Err(NullError::Cancelled {
                        completed: completed.load(Ordering::Relaxed),
                    });
                }
            }
            let mut rng = replicate_rng(self.seed, i);
            let value = task(i, &mut rng)?;
            completed.fetch_add(1, Ordering::Relaxed);
            Ok(value)
        };

        match self.execution {
            Execution::Sequential => (0..self.n_replicates).map(one).collect(),
            Execution::Parallel(pool) => {
                pool.install(|| (0..self.n_replicates).into_par_iter().map(one).collect())
            }
        }
    }
}
