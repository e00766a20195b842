//! `observe_on`: hand signals off to a worker of another scheduler while
//! preserving order.
//!
//! Buffered signals are drained by a single scheduled action per
//! empty-to-non-empty transition, tracked by a work-in-progress counter:
//! pushing onto an empty queue schedules one drain action; every other push
//! just increments the counter so the already-running (or about-to-run)
//! drain loop picks it up before it considers itself done. This is the same
//! "increment on entry, decrement at exit, zero means stop" shape used by
//! [`crate::operators::zip`]'s tick coordinator.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use rx_runtime::Scheduler;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum Signal<T> {
    Next(T),
    Error(RxError),
    Complete,
}

struct Ctx<T> {
    queue: Mutex<VecDeque<Signal<T>>>,
    wip: AtomicUsize,
    downstream: Subscriber<T>,
    worker: Arc<dyn rx_runtime::Worker>,
}

fn push<T>(ctx: &Arc<Ctx<T>>, signal: Signal<T>)
where
    T: Send + Sync + 'static,
{
    ctx.queue.lock().push_back(signal);
    if ctx.wip.fetch_add(1, Ordering::AcqRel) == 0 {
        let drain_ctx = ctx.clone();
        ctx.worker.schedule(Box::new(move |_worker| drain(&drain_ctx)));
    }
}

fn drain<T>(ctx: &Arc<Ctx<T>>)
where
    T: Send + Sync + 'static,
{
    loop {
        let next = ctx.queue.lock().pop_front();
        match next {
            Some(Signal::Next(value)) => ctx.downstream.on_next(value),
            Some(Signal::Error(error)) => ctx.downstream.on_error(error),
            Some(Signal::Complete) => ctx.downstream.on_complete(),
            None => {}
        }
        if ctx.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
            break;
        }
    }
}

/// Re-emit every signal from `source` on a fresh worker of `scheduler`.
/// FIFO order from a single source is preserved even though delivery now
/// happens on a different thread; terminal signals are queued behind every
/// preceding `next`, never ahead of them.
pub fn observe_on<T>(source: &Observable<T>, scheduler: Arc<dyn Scheduler>) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    let source = source.clone();
    Observable::create(move |downstream: Subscriber<T>| {
        let worker = scheduler.create_worker();
        downstream.add(worker.clone());

        let ctx = Arc::new(Ctx {
            queue: Mutex::new(VecDeque::new()),
            wip: AtomicUsize::new(0),
            downstream: downstream.clone(),
            worker,
        });

        let next_ctx = ctx.clone();
        let error_ctx = ctx.clone();
        let complete_ctx = ctx.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| push(&next_ctx, Signal::Next(value)),
            move |error: RxError| push(&error_ctx, Signal::Error(error)),
            move || push(&complete_ctx, Signal::Complete),
        ));
        let upstream = Subscriber::from_parent(&downstream, observer);
        source.subscribe_with(upstream);
        Ok(())
    })
}

/// Move the *subscription* itself onto a worker of `scheduler`, rather than
/// letting the caller's thread run `source`'s producer directly. Signals
/// still arrive on whatever thread the producer pushes from — use
/// [`observe_on`] as well if those also need moving. Grounded in the same
/// executor-hop shape as `observe_on`, specialized to a single one-shot
/// `schedule` of the subscribe call instead of a per-signal drain loop.
pub fn subscribe_on<T>(source: &Observable<T>, scheduler: Arc<dyn Scheduler>) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    let source = source.clone();
    Observable::create(move |downstream: Subscriber<T>| {
        let worker = scheduler.create_worker();
        downstream.add(worker.clone());

        let source = source.clone();
        let downstream = downstream.clone();
        worker.schedule(Box::new(move |_worker| {
            source.subscribe_with(downstream.clone());
        }));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::from_iter;
    use parking_lot::Mutex as StdMutex;
    use rx_runtime::Schedulers;

    #[test]
    fn preserves_fifo_order_across_the_scheduler_hop() {
        let source = from_iter(0..50);
        let moved = observe_on(&source, Schedulers::trampoline());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |v: i32| l.lock().push(v),
            |_e: RxError| {},
            || {},
        ));
        moved.subscribe(observer);
        assert_eq!(*log.lock(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn subscribe_on_runs_the_producer_on_the_given_worker() {
        let source = from_iter(vec![10, 20]);
        let moved = subscribe_on(&source, Schedulers::trampoline());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |v: i32| l.lock().push(v),
            |_e: RxError| {},
            || {},
        ));
        moved.subscribe(observer);
        assert_eq!(*log.lock(), vec![10, 20]);
    }

    #[test]
    fn terminal_signal_follows_all_preceding_values() {
        let source = from_iter(vec![1, 2, 3]);
        let moved = observe_on(&source, Schedulers::trampoline());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |v: i32| l1.lock().push(format!("next({v})")),
            |_e: RxError| {},
            move || l2.lock().push("complete".to_string()),
        ));
        moved.subscribe(observer);
        assert_eq!(
            *log.lock(),
            vec!["next(1)", "next(2)", "next(3)", "complete"]
        );
    }
}
