//! Worker pools, range partitioning and cooperative termination
//!
//! Loading and component computation are fork-join phases on a fixed-size
//! rayon pool. Workers check a shared [`TerminationFlag`] before claiming the
//! next unit of work (a batch or a chunk) and never in the middle of one.

use crate::{Error, Result};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Upper bound for configured concurrency
pub const MAX_CONCURRENCY: usize = 256;

/// Default worker count for loading and computation
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Shared stop signal for long-running phases
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag {
    terminated: Arc<AtomicBool>,
}

impl TerminationFlag {
    /// Create a flag in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every worker holding a clone of this flag to stop
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    /// True once [`terminate`](Self::terminate) was called
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Fail with [`Error::Cancelled`] if termination was requested
    pub fn assert_running(&self) -> Result<()> {
        if self.is_terminated() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Validate a concurrency setting
pub fn validate_concurrency(concurrency: usize) -> Result<()> {
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(Error::config(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, concurrency
        )));
    }
    Ok(())
}

/// Build a dedicated pool with `concurrency` named worker threads
pub fn worker_pool(concurrency: usize) -> Result<rayon::ThreadPool> {
    validate_concurrency(concurrency)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency)
        .thread_name(|index| format!("hugegraph-worker-{}", index))
        .build()?;
    Ok(pool)
}

/// Split `[0, count)` into at most `parts` contiguous, non-empty ranges of
/// near-equal size.
pub fn range_partitions(count: u64, parts: usize) -> Vec<Range<u64>> {
    if count == 0 {
        return Vec::new();
    }
    let chunk = count.div_ceil(parts.max(1) as u64);
    batch_partitions(count, chunk)
}

/// Split `[0, count)` into contiguous ranges of `batch_size` (the last one
/// may be shorter).
pub fn batch_partitions(count: u64, batch_size: u64) -> Vec<Range<u64>> {
    let batch_size = batch_size.max(1);
    (0..count.div_ceil(batch_size))
        .map(|batch| {
            let start = batch * batch_size;
            start..(start + batch_size).min(count)
        })
        .collect()
}
