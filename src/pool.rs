//! A shared worker pool used by `Composer` stages and parallel `apply`.
//!
//! This is deliberately not a process-wide singleton thread pool: the pool
//! here is an injected collaborator with an explicit lifetime — construct
//! it, hand references to it to `Composer`s that need it, and `shutdown()`
//! it when done. Internally it wraps a `rayon::ThreadPool`.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::bounded;
use log::{debug, warn};

use crate::error::Error;

/// Tunables for `WorkerPool` construction.
#[derive(Clone, Copy, Debug)]
pub struct PoolConfig {
    /// Number of worker threads, bounded in size (default 8).
    pub num_threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            num_threads: num_cpus::get().min(8),
        }
    }
}

/// A bounded worker pool with an explicit construct/shutdown lifecycle.
///
/// Not a singleton: callers own an instance and decide how long it lives
/// and how widely it is shared (e.g. across several `Composer`s built for
/// one batch of compositions).
pub struct WorkerPool {
    inner: rayon::ThreadPool,
    shut_down: AtomicBool,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let inner = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads.max(1))
            .thread_name(|i| format!("gf2-poly-worker-{}", i))
            .build()
            .expect("failed to build worker thread pool");
        debug!("worker pool constructed with {} threads", config.num_threads);
        WorkerPool {
            inner,
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn with_default_size() -> Self {
        Self::new(PoolConfig::default())
    }

    pub fn num_threads(&self) -> usize {
        self.inner.current_num_threads()
    }

    fn check_alive(&self) -> Result<(), Error> {
        if self.shut_down.load(Ordering::Acquire) {
            Err(Error::PoolShutdown)
        } else {
            Ok(())
        }
    }

    /// Run a closure that receives a `rayon::Scope` bound to this pool.
    /// A composition stage is a barrier: all tasks spawned on `scope`
    /// complete before `scope` (and thus this call) returns.
    pub fn scoped<'scope, F, R>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&rayon::Scope<'scope>) -> R + Send,
        R: Send,
    {
        self.check_alive()?;
        Ok(self.inner.scope(f))
    }

    /// Run `tasks`, collecting one result per task, as a single barrier
    /// stage: every task is spawned before any result is read back, fanning
    /// work out over a bounded `crossbeam_channel` and draining it on one
    /// thread.
    pub fn run_stage<'scope, T, F>(&self, tasks: Vec<F>) -> Result<Vec<T>, Error>
    where
        T: Send + 'scope,
        F: FnOnce() -> T + Send + 'scope,
    {
        self.check_alive()?;
        let n = tasks.len();
        let (tx, rx) = bounded(n.max(1));
        self.inner.scope(|s| {
            for task in tasks {
                let tx = tx.clone();
                s.spawn(move |_| {
                    let result = task();
                    // A closed receiver only happens if the scope already
                    // unwound from a panic in a sibling task; dropping the
                    // result silently is correct there.
                    let _ = tx.send(result);
                });
            }
        });
        drop(tx);
        let mut results = Vec::with_capacity(n);
        while let Ok(r) = rx.recv() {
            results.push(r);
        }
        if results.len() != n {
            warn!(
                "worker stage lost {} of {} tasks (a sibling task panicked)",
                n - results.len(),
                n
            );
            return Err(Error::WorkerPanic(format!(
                "stage completed {} of {} tasks",
                results.len(),
                n
            )));
        }
        Ok(results)
    }

    /// Mark the pool as shut down: every subsequent `scoped`/`run_stage`
    /// call returns `Error::PoolShutdown` instead of scheduling work. Takes
    /// `&self` (not `self`) so a pool shared via `Arc` across several
    /// `Composer`s can be retired by whichever caller is done with it last;
    /// the underlying `rayon::ThreadPool` itself drains and joins its
    /// threads when the final reference to this `WorkerPool` drops.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        debug!("worker pool shut down");
    }
}
