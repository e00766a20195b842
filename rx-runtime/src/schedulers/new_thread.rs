use super::thread_executor::{QueuedWorker, ThreadState};
use crate::scheduler::{Scheduler, Worker};
use std::sync::Arc;

/// Creates a freshly-spawned thread for every worker. The thread exits once
/// its worker is unsubscribed and its queue drains.
pub struct NewThreadScheduler;

impl NewThreadScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NewThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for NewThreadScheduler {
    fn now(&self) -> u64 {
        super::now_millis()
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        let state = ThreadState::new();
        state.spawn_thread();
        Arc::new(QueuedWorker::new(state))
    }
}
