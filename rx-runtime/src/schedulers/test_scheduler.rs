use crate::scheduler::{Action, Scheduler, Worker};
use parking_lot::Mutex;
use rx_core::subscription::{BooleanSubscription, CompositeSubscription};
use rx_core::Subscription;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Entry {
    due: Duration,
    seq: u64,
    cancelled: Arc<BooleanSubscription>,
    composite: Arc<CompositeSubscription>,
    action: Mutex<Option<Action>>,
}

struct Inner {
    now: Mutex<Duration>,
    queue: Mutex<Vec<Entry>>,
    seq: AtomicU64,
}

/// A virtual-time scheduler for deterministic tests.
///
/// No action runs until the clock is advanced with [`TestScheduler::advance_by`],
/// [`TestScheduler::advance_to`], or [`TestScheduler::trigger`]. Actions with
/// equal due times run in schedule order. Cancelled actions are skipped
/// without running.
pub struct TestScheduler {
    inner: Arc<Inner>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                now: Mutex::new(Duration::ZERO),
                queue: Mutex::new(Vec::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// The current virtual time.
    pub fn current_time(&self) -> Duration {
        *self.inner.now.lock()
    }

    /// Advance the virtual clock by `delta`, running every action due at or
    /// before the new time, in due-time order (ties broken by schedule order).
    pub fn advance_by(&self, delta: Duration) {
        let target = self.current_time() + delta;
        self.advance_to(target);
    }

    /// Advance the virtual clock to the absolute time `target`, running
    /// every action due at or before it.
    pub fn advance_to(&self, target: Duration) {
        loop {
            let next = {
                let mut queue = self.inner.queue.lock();
                (0..queue.len())
                    .filter(|&i| queue[i].due <= target)
                    .min_by_key(|&i| (queue[i].due, queue[i].seq))
                    .map(|idx| queue.remove(idx))
            };
            let Some(entry) = next else { break };
            *self.inner.now.lock() = entry.due;
            self.run(entry);
        }
        let mut now = self.inner.now.lock();
        if *now < target {
            *now = target;
        }
    }

    /// Drain every pending action regardless of due time, advancing the
    /// clock to each one's due time as it fires. Useful when the exact
    /// schedule of delays is not known up front.
    pub fn trigger(&self) {
        loop {
            let next = {
                let mut queue = self.inner.queue.lock();
                (0..queue.len())
                    .min_by_key(|&i| (queue[i].due, queue[i].seq))
                    .map(|idx| queue.remove(idx))
            };
            let Some(entry) = next else { break };
            *self.inner.now.lock() = entry.due;
            self.run(entry);
        }
    }

    fn run(&self, entry: Entry) {
        if entry.cancelled.is_unsubscribed() {
            return;
        }
        if let Some(action) = entry.action.lock().take() {
            let worker = TestWorker {
                inner: self.inner.clone(),
                composite: entry.composite.clone(),
            };
            action(&worker);
        }
    }
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TestScheduler {
    fn now(&self) -> u64 {
        self.current_time().as_millis() as u64
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TestWorker {
            inner: self.inner.clone(),
            composite: Arc::new(CompositeSubscription::new()),
        })
    }
}

struct TestWorker {
    inner: Arc<Inner>,
    composite: Arc<CompositeSubscription>,
}

impl Subscription for TestWorker {
    fn unsubscribe(&self) {
        self.composite.unsubscribe();
    }

    fn is_unsubscribed(&self) -> bool {
        self.composite.is_unsubscribed()
    }
}

impl Worker for TestWorker {
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

        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        let due = *self.inner.now.lock() + delay;
        self.inner.queue.lock().push(Entry {
            due,
            seq,
            cancelled: item,
            composite: self.composite.clone(),
            action: Mutex::new(Some(action)),
        });
        as_sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_fire_in_due_time_order_not_schedule_order() {
        let scheduler = TestScheduler::new();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        worker.schedule_after(Box::new(move |_| l1.lock().push("b")), Duration::from_secs(2));
        let l2 = log.clone();
        worker.schedule_after(Box::new(move |_| l2.lock().push("a")), Duration::from_secs(1));

        scheduler.advance_by(Duration::from_secs(3));
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn nothing_fires_before_the_clock_advances() {
        let scheduler = TestScheduler::new();
        let worker = scheduler.create_worker();
        let ran = Arc::new(Mutex::new(false));
        let r = ran.clone();
        worker.schedule(Box::new(move |_| *r.lock() = true));
        assert!(!*ran.lock());
        scheduler.advance_by(Duration::ZERO);
        assert!(*ran.lock());
    }

    #[test]
    fn cancelled_action_is_skipped() {
        let scheduler = TestScheduler::new();
        let worker = scheduler.create_worker();
        let ran = Arc::new(Mutex::new(false));
        let r = ran.clone();
        let sub = worker.schedule_after(Box::new(move |_| *r.lock() = true), Duration::from_secs(1));
        sub.unsubscribe();
        scheduler.advance_by(Duration::from_secs(2));
        assert!(!*ran.lock());
    }

    #[test]
    fn ties_at_equal_due_time_run_in_schedule_order() {
        let scheduler = TestScheduler::new();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let l = log.clone();
            worker.schedule_after(Box::new(move |_| l.lock().push(i)), Duration::from_secs(1));
        }
        scheduler.advance_by(Duration::from_secs(1));
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn trigger_drains_regardless_of_due_time() {
        let scheduler = TestScheduler::new();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        worker.schedule_after(Box::new(move |_| l.lock().push(1)), Duration::from_secs(100));
        scheduler.trigger();
        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(scheduler.current_time(), Duration::from_secs(100));
    }

    #[test]
    fn periodic_scheduling_fires_at_initial_delay_then_every_period() {
        let scheduler = Arc::new(TestScheduler::new());
        let worker = scheduler.create_worker();
        let fire_times: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));

        let times = fire_times.clone();
        let clock = scheduler.clone();
        let action: crate::RepeatableAction = Arc::new(move |_w: &dyn Worker| {
            times.lock().push(clock.current_time());
        });

        worker.schedule_periodic(action, Duration::from_secs(1), Duration::from_secs(2));
        scheduler.advance_to(Duration::from_secs(7));

        let times = fire_times.lock();
        assert_eq!(times.len(), 4, "expected exactly 4 firings by t=7s");
        assert_eq!(
            *times,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(5),
                Duration::from_secs(7),
            ]
        );
    }
}
