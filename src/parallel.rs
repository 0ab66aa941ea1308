//! Fixed-size worker pool shared by kernel evaluation, linear algebra and prediction
//!
//! Every parallel section is fork-join over contiguous index ranges: the
//! range is split into one block per worker, each worker writes only its own
//! block, and the call returns after all blocks are done.

use crate::core::{Result, SVMError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;

/// Rayon thread pool sized by the caller's thread count
pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    /// Create a pool with exactly `threads` workers
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(SVMError::InvalidParameter(
                "Thread count must be at least 1".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SVMError::InvalidParameter(format!("Failed to create thread pool: {e}")))?;
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `op` inside the pool so nested rayon and faer work uses its workers
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        self.pool.install(op)
    }

    /// faer parallelism hint matching this pool
    pub fn par(&self) -> faer::Par {
        if self.threads == 1 {
            faer::Par::Seq
        } else {
            faer::Par::rayon(self.threads)
        }
    }

    /// Fill `out`, viewed as rows of `row_len` values, one contiguous row block per worker
    ///
    /// `f` receives the row range of its block and the matching slice of `out`.
    pub fn for_each_row_block<F>(&self, out: &mut [f64], row_len: usize, f: F)
    where
        F: Fn(Range<usize>, &mut [f64]) + Send + Sync,
    {
        if row_len == 0 || out.is_empty() {
            return;
        }
        let rows = out.len() / row_len;
        let block = rows.div_ceil(self.threads).max(1);
        self.install(|| {
            out.par_chunks_mut(block * row_len)
                .enumerate()
                .for_each(|(b, chunk)| {
                    let start = b * block;
                    f(start..start + chunk.len() / row_len, chunk);
                });
        });
    }

    /// Evaluate `f` over `0..len`, one contiguous block per worker, keeping index order
    pub fn map_indices<T, F>(&self, len: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        let blocks = row_blocks(len, self.threads);
        let parts: Vec<Vec<T>> = self.install(|| {
            blocks
                .into_par_iter()
                .map(|range| range.map(&f).collect())
                .collect()
        });
        parts.into_iter().flatten().collect()
    }
}

/// Split `0..len` into at most `parts` contiguous, non-empty, non-overlapping ranges
pub fn row_blocks(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1).min(len.max(1));
    (0..parts)
        .map(|i| (i * len / parts)..((i + 1) * len / parts))
        .filter(|r| !r.is_empty())
        .collect()
}
