//! Bounded concurrent map over a list of inputs.

use rayon::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};

/// Runs a function over inputs, sequentially or on a bounded worker pool.
#[derive(Debug, Clone, Copy)]
pub struct TaskScheduler {
    max_workers: usize,
}

impl TaskScheduler {
    pub fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// See [`map_concurrent`].
    pub fn map<T, R, F>(&self, inputs: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        map_concurrent(f, inputs, self.max_workers)
    }
}

/// Applies `f` to every input and returns the results in input order.
///
/// - No inputs: returns immediately without building a pool.
/// - `max_workers <= 1`: plain sequential iteration, stopping at the first error.
/// - Otherwise at most `max_workers` calls run at once on a dedicated pool.
///   Calls already handed to a worker are never cancelled; once every call has
///   returned, any failure is reported as [`Error::Scheduler`] carrying the
///   error of the earliest failing input.
pub fn map_concurrent<T, R, F>(f: F, inputs: &[T], max_workers: usize) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let total = inputs.len();

    if max_workers <= 1 {
        let mut results = Vec::with_capacity(total);
        for input in inputs {
            match f(input) {
                Ok(r) => results.push(r),
                Err(e) => {
                    return Err(Error::Scheduler {
                        failed: 1,
                        total,
                        first: Box::new(e),
                    })
                }
            }
        }
        return Ok(results);
    }

    let threads = max_workers.min(total);
    debug!(threads, tasks = total, "starting worker pool");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("wsorch-worker-{}", i))
        .build()
        .map_err(|e| Error::WorkerPool(e.to_string()))?;

    let outcomes: Vec<Result<R>> = pool.install(|| inputs.par_iter().map(&f).collect());

    let failed = outcomes.iter().filter(|r| r.is_err()).count();
    if failed == 0 {
        return Ok(outcomes.into_iter().filter_map(|r| r.ok()).collect());
    }

    let first = outcomes
        .into_iter()
        .find_map(|r| r.err())
        .ok_or_else(|| Error::WorkerPool("failure count mismatch".to_string()))?;

    Err(Error::Scheduler {
        failed,
        total,
        first: Box::new(first),
    })
}
