//! Named, process-wide scheduler access.

use crate::schedulers::{ImmediateScheduler, NewThreadScheduler, PoolScheduler, TrampolineScheduler};
#[cfg(feature = "runtime-tokio")]
use crate::schedulers::TokioScheduler;
use crate::Scheduler;
use parking_lot::RwLock;
use std::sync::Arc;

static COMPUTATION: RwLock<Option<Arc<PoolScheduler>>> = RwLock::new(None);
static IO: RwLock<Option<Arc<PoolScheduler>>> = RwLock::new(None);

fn computation_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn io_pool_size() -> usize {
    computation_pool_size() * 4
}

/// Named factories for the scheduler variants, plus the two process-wide
/// pools (`computation`, `io`) that outlive any single worker and must be
/// torn down explicitly.
pub struct Schedulers;

impl Schedulers {
    /// Runs every action synchronously on the calling thread.
    pub fn immediate() -> Arc<dyn Scheduler> {
        Arc::new(ImmediateScheduler::new())
    }

    /// Runs actions one at a time on the calling thread, FIFO by due time;
    /// nested scheduling is queued rather than recursed.
    pub fn trampoline() -> Arc<dyn Scheduler> {
        Arc::new(TrampolineScheduler::new())
    }

    /// Creates a freshly-spawned thread per worker.
    pub fn new_thread() -> Arc<dyn Scheduler> {
        Arc::new(NewThreadScheduler::new())
    }

    /// The shared, CPU-sized pool intended for computational work. Lazily
    /// created on first use; survives across calls until [`Self::shutdown`].
    pub fn computation() -> Arc<dyn Scheduler> {
        pooled(&COMPUTATION, computation_pool_size)
    }

    /// The shared, larger pool intended for blocking I/O-bound work.
    pub fn io() -> Arc<dyn Scheduler> {
        pooled(&IO, io_pool_size)
    }

    /// (Re)create the shared `computation` pool with exactly `size` threads,
    /// shutting down whatever pool was previously installed first. Unlike
    /// [`Self::computation`], this always rebuilds the pool rather than
    /// reusing one lazily created by an earlier call.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn computation_sized(size: usize) -> Arc<dyn Scheduler> {
        assert_ne!(
            size, 0,
            "Schedulers::computation_sized: size must be greater than zero"
        );
        resized(&COMPUTATION, size)
    }

    /// (Re)create the shared `io` pool with exactly `size` threads. See
    /// [`Self::computation_sized`] for replacement semantics.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn io_sized(size: usize) -> Arc<dyn Scheduler> {
        assert_ne!(size, 0, "Schedulers::io_sized: size must be greater than zero");
        resized(&IO, size)
    }

    /// Bridge an existing `tokio` runtime handle in as a scheduler.
    #[cfg(feature = "runtime-tokio")]
    pub fn from_tokio(handle: tokio::runtime::Handle) -> Arc<dyn Scheduler> {
        Arc::new(TokioScheduler::new(handle))
    }

    /// A fresh virtual-time scheduler for tests. Unlike the other factories,
    /// each call returns an independent clock — schedulers are not shared
    /// across tests by default.
    pub fn test() -> crate::schedulers::TestScheduler {
        crate::schedulers::TestScheduler::new()
    }

    /// Shut down the shared `computation` and `io` pools. Actions already
    /// queued on them still run; new work should not be scheduled on workers
    /// obtained before this call.
    pub fn shutdown() {
        if let Some(pool) = COMPUTATION.write().take() {
            pool.shutdown();
        }
        if let Some(pool) = IO.write().take() {
            pool.shutdown();
        }
    }

    /// Recreate the shared pools after [`Self::shutdown`]. A no-op for a
    /// pool that was never shut down.
    pub fn restart() {
        let _ = Self::computation();
        let _ = Self::io();
    }
}

fn pooled(slot: &'static RwLock<Option<Arc<PoolScheduler>>>, size: fn() -> usize) -> Arc<dyn Scheduler> {
    if let Some(existing) = slot.read().as_ref() {
        return existing.clone();
    }
    let mut guard = slot.write();
    if guard.is_none() {
        *guard = Some(Arc::new(PoolScheduler::new(size())));
    }
    guard.as_ref().unwrap().clone()
}

fn resized(slot: &'static RwLock<Option<Arc<PoolScheduler>>>, size: usize) -> Arc<dyn Scheduler> {
    let mut guard = slot.write();
    if let Some(previous) = guard.take() {
        previous.shutdown();
    }
    let fresh = Arc::new(PoolScheduler::new(size));
    *guard = Some(fresh.clone());
    fresh
}
