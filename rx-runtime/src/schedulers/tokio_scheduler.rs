use crate::scheduler::{Action, Scheduler, Worker};
use rx_core::subscription::{BooleanSubscription, CompositeSubscription};
use rx_core::Subscription;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Bridges an external `tokio` runtime into the `Scheduler` abstraction.
/// Every scheduled action is spawned as a task on the wrapped handle; delays
/// use `tokio::time::sleep` rather than blocking a thread.
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Wrap an explicit runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Wrap the handle of the runtime the caller is currently running on.
    /// Panics outside a tokio runtime context, matching `Handle::current`.
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> u64 {
        super::now_millis()
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TokioWorker {
            handle: self.handle.clone(),
            composite: Arc::new(CompositeSubscription::new()),
        })
    }
}

#[derive(Clone)]
struct TokioWorker {
    handle: Handle,
    composite: Arc<CompositeSubscription>,
}

impl Subscription for TokioWorker {
    fn unsubscribe(&self) {
        self.composite.unsubscribe();
    }

    fn is_unsubscribed(&self) -> bool {
        self.composite.is_unsubscribed()
    }
}

impl Worker for TokioWorker {
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

        let worker = self.clone();
        self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !item.is_unsubscribed() {
                action(&worker);
            }
            let item: Arc<dyn Subscription> = item;
            worker.composite.remove(&item);
        });
        as_sub
    }
}
