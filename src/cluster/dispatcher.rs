//! Bounded parallel dispatch of batch work over contiguous shards.
//!
//! Each shard runs on its own scoped thread and borrows one heavyweight
//! resource (a classifier handle, an extractor) from a checkout pool for the
//! duration of the shard. Resources are created lazily by a factory and reused
//! by later shards and later runs of the same dispatcher.

use parking_lot::Mutex;
use std::ops::Range;
use tracing::{debug, error};

use crate::types::{Result, ThreadsError};

/// Contiguous shard bounds for `items` items over at most `budget` workers.
///
/// `min(items, budget)` shards of `items / workers` items each; the last shard
/// also takes the remainder.
pub fn shard_bounds(items: usize, budget: usize) -> Vec<Range<usize>> {
    let workers = items.min(budget);
    if workers == 0 {
        return Vec::new();
    }
    let per_worker = items / workers;
    (0..workers)
        .map(|w| {
            let start = w * per_worker;
            let end = if w + 1 == workers { items } else { start + per_worker };
            start..end
        })
        .collect()
}

type Factory<R> = Box<dyn Fn() -> Result<R> + Send + Sync>;

/// Runs shard closures in parallel with pooled per-worker resources.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new("news", 8, move || LinearNewsClassifier::load(&path, dim));
/// let accepted = dispatcher.run(&vectors, |classifier, offset, shard| {
///     Ok(classifier.classify(shard).into_iter().enumerate().map(|(i, ok)| (offset + i, ok)).collect())
/// });
/// ```
pub struct Dispatcher<R> {
    label: &'static str,
    workers: usize,
    factory: Factory<R>,
    pool: Mutex<Vec<R>>,
}

impl<R: Send> Dispatcher<R> {
    /// Create a dispatcher with a worker budget and a resource factory.
    pub fn new<F>(label: &'static str, workers: usize, factory: F) -> Self
    where
        F: Fn() -> Result<R> + Send + Sync + 'static,
    {
        Self {
            label,
            workers,
            factory: Box::new(factory),
            pool: Mutex::new(Vec::new()),
        }
    }

    /// Worker budget.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of idle resources currently pooled.
    pub fn pooled(&self) -> usize {
        self.pool.lock().len()
    }

    /// Process `items` shard by shard and merge the outputs.
    ///
    /// `process` receives the shard's resource, the offset of the shard in
    /// `items` and the shard itself. A shard that returns an error or panics is
    /// logged and contributes nothing; sibling shards are unaffected. The
    /// merged order across shards is unspecified.
    pub fn run<T, O, P>(&self, items: &[T], process: P) -> Vec<O>
    where
        T: Sync,
        O: Send,
        P: Fn(&mut R, usize, &[T]) -> Result<Vec<O>> + Sync,
    {
        let bounds = shard_bounds(items.len(), self.workers);
        debug!(stage = self.label, items = items.len(), shards = bounds.len(), "Dispatching");

        let merged: Mutex<Vec<O>> = Mutex::new(Vec::with_capacity(items.len()));
        let scoped = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = bounds
                .into_iter()
                .enumerate()
                .map(|(shard, range)| {
                    let merged = &merged;
                    let process = &process;
                    let handle = scope.spawn(move |_| match self.run_shard(range, items, process) {
                        Ok(outputs) => merged.lock().extend(outputs),
                        Err(e) => error!(stage = self.label, shard, error = %e, "Shard failed"),
                    });
                    (shard, handle)
                })
                .collect();

            for (shard, handle) in handles {
                if handle.join().is_err() {
                    error!(stage = self.label, shard, "Shard panicked");
                }
            }
        });
        if scoped.is_err() {
            error!(stage = self.label, "Dispatcher scope ended with a panic");
        }

        merged.into_inner()
    }

    fn run_shard<T, O, P>(&self, range: Range<usize>, items: &[T], process: &P) -> Result<Vec<O>>
    where
        P: Fn(&mut R, usize, &[T]) -> Result<Vec<O>>,
    {
        let pooled = self.pool.lock().pop();
        let mut resource = match pooled {
            Some(resource) => resource,
            None => (self.factory)()?,
        };

        let shard = items
            .get(range.clone())
            .ok_or_else(|| ThreadsError::WorkerError(format!("shard {:?} out of bounds", range)))?;
        let outputs = process(&mut resource, range.start, shard);
        self.pool.lock().push(resource);
        outputs
    }
}
