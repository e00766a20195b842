use crate::scheduler::{Action, Scheduler, Worker};
use rx_core::subscription::{BooleanSubscription, CompositeSubscription};
use rx_core::Subscription;
use std::sync::Arc;
use std::time::Duration;

/// Runs every action synchronously on the calling thread, blocking for
/// `schedule_after`'s delay before running it.
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImmediateScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ImmediateScheduler {
    fn now(&self) -> u64 {
        super::now_millis()
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(ImmediateWorker {
            composite: CompositeSubscription::new(),
        })
    }
}

struct ImmediateWorker {
    composite: CompositeSubscription,
}

impl Subscription for ImmediateWorker {
    fn unsubscribe(&self) {
        self.composite.unsubscribe();
    }

    fn is_unsubscribed(&self) -> bool {
        self.composite.is_unsubscribed()
    }
}

impl Worker for ImmediateWorker {
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
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if !as_sub.is_unsubscribed() {
            action(self);
        }
        self.composite.remove(&as_sub);
        as_sub
    }
}
