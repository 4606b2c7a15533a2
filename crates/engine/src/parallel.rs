//! Shard-parallel execution.
//!
//! Work is cut into fixed-size shards; shard results come back in shard
//! order and merge sequentially, so the outcome never depends on the
//! worker count. Cancellation is checked at shard boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use reclink_core::LinkError;

pub const SHARD_SIZE: usize = 2048;

/// Cooperative cancellation flag, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub fn build_pool(workers: usize) -> Result<rayon::ThreadPool, LinkError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| LinkError::ConfigValidation(format!("worker pool: {e}")))
}

/// Maps `f` over shards of `items`, in parallel, preserving shard order.
pub fn shard_map<T, R, F>(
    pool: &rayon::ThreadPool,
    items: &[T],
    cancel: &CancelToken,
    f: F,
) -> Result<Vec<R>, LinkError>
where
    T: Sync,
    R: Send,
    F: Fn(&[T]) -> R + Sync,
{
    pool.install(|| {
        items
            .par_chunks(SHARD_SIZE)
            .map(|shard| {
                if cancel.is_cancelled() {
                    Err(LinkError::Cancelled)
                } else {
                    Ok(f(shard))
                }
            })
            .collect()
    })
}

/// Like `shard_map` but over index ranges `[start, end)` of a collection
/// of `len` items, for callers that shard by position rather than value.
pub fn map_ranges<R, F>(
    pool: &rayon::ThreadPool,
    len: usize,
    cancel: &CancelToken,
    f: F,
) -> Result<Vec<R>, LinkError>
where
    R: Send,
    F: Fn(usize, usize) -> R + Sync,
{
    let ranges: Vec<(usize, usize)> = (0..len)
        .step_by(SHARD_SIZE)
        .map(|start| (start, (start + SHARD_SIZE).min(len)))
        .collect();
    pool.install(|| {
        ranges
            .par_iter()
            .map(|&(start, end)| {
                if cancel.is_cancelled() {
                    Err(LinkError::Cancelled)
                } else {
                    Ok(f(start, end))
                }
            })
            .collect()
    })
}
