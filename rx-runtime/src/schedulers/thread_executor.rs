//! Shared priority-queue executor backing the new-thread and pool schedulers.
//!
//! Both variants are "one persistent thread draining a due-time-ordered
//! queue"; they differ only in how many threads exist and how long they
//! live. A [`QueuedWorker`] is a cheap, clonable view onto one such queue
//! plus its own cancellation group, so recursive self-scheduling (an action
//! calling `schedule` again on the worker handed to it) just pushes another
//! entry onto the same queue.

use crate::scheduler::{Action, Worker};
use parking_lot::{Condvar, Mutex};
use rx_core::subscription::{BooleanSubscription, CompositeSubscription};
use rx_core::Subscription;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
    due: Instant,
    seq: u64,
    cancelled: Arc<BooleanSubscription>,
    composite: Arc<CompositeSubscription>,
    action: Mutex<Option<Action>>,
}

/// A due-time-ordered queue drained by one or more background threads.
pub(crate) struct ThreadState {
    queue: Mutex<Vec<Entry>>,
    cv: Condvar,
    shutdown: AtomicBool,
    seq: AtomicU64,
}

impl ThreadState {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(Vec::new()),
            cv: Condvar::new(),
            shutdown: AtomicBool::new(false),
            seq: AtomicU64::new(0),
        })
    }

    fn push(
        &self,
        due: Instant,
        cancelled: Arc<BooleanSubscription>,
        composite: Arc<CompositeSubscription>,
        action: Action,
    ) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.queue.lock();
        queue.push(Entry {
            due,
            seq,
            cancelled,
            composite,
            action: Mutex::new(Some(action)),
        });
        self.cv.notify_all();
    }

    /// Stop accepting new work from the draining thread(s) once the queue
    /// empties. Already-queued entries still run.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.cv.notify_all();
    }

    /// Spawn one background thread draining this queue.
    pub(crate) fn spawn_thread(self: &Arc<Self>) {
        let state = self.clone();
        std::thread::spawn(move || Self::run(state));
    }

    fn run(state: Arc<Self>) {
        loop {
            let entry = 'wait: {
                let mut queue = state.queue.lock();
                loop {
                    if let Some(idx) = (0..queue.len()).min_by_key(|&i| (queue[i].due, queue[i].seq))
                    {
                        let now = Instant::now();
                        if queue[idx].due <= now {
                            break 'wait Some(queue.remove(idx));
                        }
                        state.cv.wait_for(&mut queue, queue[idx].due - now);
                        continue;
                    }
                    if state.shutdown.load(Ordering::SeqCst) {
                        break 'wait None;
                    }
                    state.cv.wait(&mut queue);
                }
            };
            let Some(entry) = entry else { return };
            if entry.cancelled.is_unsubscribed() {
                continue;
            }
            if let Some(action) = entry.action.lock().take() {
                let worker = QueuedWorker {
                    state: state.clone(),
                    composite: entry.composite.clone(),
                    owns_thread: false,
                };
                action(&worker);
            }
        }
    }
}

/// A view onto a [`ThreadState`] queue, scoped to its own cancellation group.
///
/// `owns_thread` marks whether unsubscribing this worker should also shut
/// down the underlying draining thread: true for a dedicated new-thread
/// worker, false for a worker pinned to one thread of a shared pool (the
/// pool's threads outlive any single worker view).
#[derive(Clone)]
pub(crate) struct QueuedWorker {
    state: Arc<ThreadState>,
    composite: Arc<CompositeSubscription>,
    owns_thread: bool,
}

impl QueuedWorker {
    pub(crate) fn new(state: Arc<ThreadState>) -> Self {
        Self {
            state,
            composite: Arc::new(CompositeSubscription::new()),
            owns_thread: true,
        }
    }

    pub(crate) fn pooled(state: Arc<ThreadState>) -> Self {
        Self {
            state,
            composite: Arc::new(CompositeSubscription::new()),
            owns_thread: false,
        }
    }
}

impl Subscription for QueuedWorker {
    fn unsubscribe(&self) {
        self.composite.unsubscribe();
        if self.owns_thread {
            self.state.shutdown();
        }
    }

    fn is_unsubscribed(&self) -> bool {
        self.composite.is_unsubscribed()
    }
}

impl Worker for QueuedWorker {
    fn schedule(&self, action: Action) -> Arc<dyn Subscription> {
        self.schedule_after(action, Duration::ZERO)
    }

    fn schedule_after(&self, action: Action, delay: Duration) -> Arc<dyn Subscription> {
        if self.is_unsubscribed() {
            return rx_core::subscription::unsubscribed();
        }
        let item = Arc::new(BooleanSubscription::new());
        let as_sub: Arc<dyn Subscription> = item.clone();
        self.composite.add(as_sub.clone());
        self.state
            .push(Instant::now() + delay, item, self.composite.clone(), action);
        as_sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn runs_actions_in_due_time_order() {
        let state = ThreadState::new();
        state.spawn_thread();
        let worker = QueuedWorker::new(state.clone());
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        worker.schedule_after(Box::new(move |_| l1.lock().push(2)), Duration::from_millis(40));
        let l2 = log.clone();
        worker.schedule_after(Box::new(move |_| l2.lock().push(1)), Duration::from_millis(10));

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(*log.lock(), vec![1, 2]);
        state.shutdown();
    }

    #[test]
    fn unsubscribed_worker_skips_queued_work() {
        let state = ThreadState::new();
        state.spawn_thread();
        let worker = QueuedWorker::new(state.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        worker.schedule_after(
            Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
            Duration::from_millis(30),
        );
        worker.unsubscribe();
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        state.shutdown();
    }
}
