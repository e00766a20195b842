use super::thread_executor::{QueuedWorker, ThreadState};
use crate::scheduler::{Scheduler, Worker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A fixed-size pool of persistent background threads, shared by potentially
/// many workers. Each worker is pinned to exactly one underlying thread (so
/// actions scheduled on that worker run in a single total order), chosen
/// round-robin from the pool.
///
/// Unlike [`super::new_thread::NewThreadScheduler`], unsubscribing a worker
/// only cancels its own pending actions; the pool's threads are process-wide
/// resources torn down explicitly (see [`crate::registry::Schedulers`]).
pub struct PoolScheduler {
    threads: Vec<Arc<ThreadState>>,
    next: AtomicUsize,
}

impl PoolScheduler {
    /// Create a pool with `size` persistent threads. `size` is clamped to at
    /// least 1.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let threads: Vec<Arc<ThreadState>> = (0..size)
            .map(|_| {
                let state = ThreadState::new();
                state.spawn_thread();
                state
            })
            .collect();
        Self {
            threads,
            next: AtomicUsize::new(0),
        }
    }

    /// Shut down every thread in the pool. Already-queued work still runs;
    /// no new work should be scheduled on workers obtained before this call.
    pub fn shutdown(&self) {
        for state in &self.threads {
            state.shutdown();
        }
    }
}

impl Scheduler for PoolScheduler {
    fn now(&self) -> u64 {
        super::now_millis()
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        let idx = self.next.fetch_add(1, Ordering::SeqCst) % self.threads.len();
        Arc::new(QueuedWorker::pooled(self.threads[idx].clone()))
    }
}
