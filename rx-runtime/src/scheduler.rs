//! Scheduler/Worker abstraction.

use rx_core::subscription::SerialSubscription;
use rx_core::Subscription;
use std::sync::Arc;
use std::time::Duration;

/// A one-shot action. Receives a handle to the worker it is running on, so
/// it can recursively reschedule itself.
pub type Action = Box<dyn FnOnce(&dyn Worker) + Send>;

/// An action that can fire more than once, used by [`Worker::schedule_periodic`].
pub type RepeatableAction = Arc<dyn Fn(&dyn Worker) + Send + Sync>;

/// Factory for [`Worker`]s. Exposes the scheduler's notion of "now" and
/// worker creation.
pub trait Scheduler: Send + Sync {
    /// Current time in milliseconds, on this scheduler's clock (wall-clock
    /// for real schedulers, virtual clock for the test scheduler).
    fn now(&self) -> u64;

    /// Create a new worker. Workers are cheap and typically short-lived;
    /// unsubscribing one cancels only the work scheduled on it.
    fn create_worker(&self) -> Arc<dyn Worker>;
}

/// A single-ordered execution context obtained from a [`Scheduler`].
///
/// States are one-way: *active* → *unsubscribed*. A worker is itself a
/// subscription: unsubscribing it cancels every action scheduled on it that
/// hasn't already run.
pub trait Worker: Subscription {
    /// Run `action` on this worker as soon as possible.
    fn schedule(&self, action: Action) -> Arc<dyn Subscription>;

    /// Run `action` on this worker after `delay`.
    fn schedule_after(&self, action: Action, delay: Duration) -> Arc<dyn Subscription>;

    /// Run `action` after `initial_delay`, then every `period` thereafter,
    /// until the returned subscription (or this worker) is unsubscribed.
    ///
    /// Derived from `schedule_after`: the action re-schedules itself from
    /// within its own invocation.
    fn schedule_periodic(
        &self,
        action: RepeatableAction,
        initial_delay: Duration,
        period: Duration,
    ) -> Arc<dyn Subscription> {
        let serial = Arc::new(SerialSubscription::new());
        schedule_tick(self, action, period, serial.clone(), initial_delay);
        serial
    }
}

fn schedule_tick(
    worker: &dyn Worker,
    action: RepeatableAction,
    period: Duration,
    serial: Arc<SerialSubscription>,
    delay: Duration,
) {
    let tick: Action = {
        let action = action.clone();
        let serial = serial.clone();
        Box::new(move |w: &dyn Worker| {
            if serial.is_unsubscribed() {
                return;
            }
            action(w);
            schedule_tick(w, action, period, serial, period);
        })
    };
    let sub = worker.schedule_after(tick, delay);
    serial.set(sub);
}
