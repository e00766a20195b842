use crate::scheduler::{Action, Scheduler, Worker};
use rx_core::subscription::{BooleanSubscription, CompositeSubscription};
use rx_core::Subscription;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Runs actions on the calling thread, one at a time, FIFO by due time.
///
/// The first `schedule`/`schedule_after` call on an otherwise-idle thread
/// drains the queue inline; any action scheduled from within another
/// action's execution (including recursive self-scheduling) is appended to
/// the same queue rather than recursing the call stack.
pub struct TrampolineScheduler;

impl TrampolineScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TrampolineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TrampolineScheduler {
    fn now(&self) -> u64 {
        super::now_millis()
    }

    fn create_worker(&self) -> Arc<dyn Worker> {
        Arc::new(TrampolineWorker {
            composite: CompositeSubscription::new(),
        })
    }
}

struct QueueItem {
    due: Instant,
    seq: u64,
    cancelled: Arc<BooleanSubscription>,
    action: Action,
}

thread_local! {
    static QUEUE: RefCell<Vec<QueueItem>> = RefCell::new(Vec::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static SEQ: Cell<u64> = const { Cell::new(0) };
}

struct TrampolineWorker {
    composite: CompositeSubscription,
}

impl Subscription for TrampolineWorker {
    fn unsubscribe(&self) {
        self.composite.unsubscribe();
    }

    fn is_unsubscribed(&self) -> bool {
        self.composite.is_unsubscribed()
    }
}

impl Worker for TrampolineWorker {
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

        let seq = SEQ.with(|s| {
            let v = s.get();
            s.set(v + 1);
            v
        });
        QUEUE.with(|q| {
            q.borrow_mut().push(QueueItem {
                due: Instant::now() + delay,
                seq,
                cancelled: item,
                action,
            })
        });
        drain(self);
        as_sub
    }
}

fn drain(worker: &dyn Worker) {
    let already_draining = DRAINING.with(|d| {
        if d.get() {
            true
        } else {
            d.set(true);
            false
        }
    });
    if already_draining {
        return;
    }
    loop {
        let next = QUEUE.with(|q| {
            let mut queue = q.borrow_mut();
            (0..queue.len())
                .min_by_key(|&i| (queue[i].due, queue[i].seq))
                .map(|idx| queue.remove(idx))
        });
        let Some(item) = next else { break };
        if item.cancelled.is_unsubscribed() {
            continue;
        }
        let now = Instant::now();
        if item.due > now {
            std::thread::sleep(item.due - now);
        }
        if item.cancelled.is_unsubscribed() {
            continue;
        }
        (item.action)(worker);
    }
    DRAINING.with(|d| d.set(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn nested_schedule_runs_after_current_action_not_recursively() {
        let scheduler = TrampolineScheduler::new();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        let w = worker.clone();
        worker.schedule(Box::new(move |_| {
            l1.lock().push("outer-start");
            let l2 = l1.clone();
            w.schedule(Box::new(move |_| l2.lock().push("inner")));
            l1.lock().push("outer-end");
        }));

        assert_eq!(*log.lock(), vec!["outer-start", "outer-end", "inner"]);
    }

    #[test]
    fn orders_by_due_time_not_schedule_order() {
        let scheduler = TrampolineScheduler::new();
        let worker = scheduler.create_worker();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l1 = log.clone();
        worker.schedule_after(Box::new(move |_| l1.lock().push(2)), Duration::from_millis(20));
        let l2 = log.clone();
        worker.schedule_after(Box::new(move |_| l2.lock().push(1)), Duration::from_millis(1));

        assert_eq!(*log.lock(), vec![1, 2]);
    }
}
