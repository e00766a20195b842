//! Factory primitives: `just`, `from`, `empty`, `error`, `range`, `create`,
//! `defer`, `interval`. The wide catalog of trivial transforms lives under
//! [`crate::operators`] as a representative sample, not an exhaustive one.

use crate::Observable;
use rx_core::{RxError, Subscriber};
use rx_runtime::{RepeatableAction, Scheduler};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Emit a single value, then complete.
pub fn just<T>(value: T) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    Observable::create(move |subscriber: Subscriber<T>| {
        subscriber.on_next(value.clone());
        subscriber.on_complete();
        Ok(())
    })
}

/// Emit every item of `items` in order, then complete. Checks
/// `is_unsubscribed` between items so a cancelled subscriber stops a long
/// iterator promptly instead of running it to exhaustion.
pub fn from_iter<T, I>(items: I) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + Sync + Clone + 'static,
{
    let iter = items.into_iter();
    Observable::create(move |subscriber: Subscriber<T>| {
        for value in iter.clone() {
            if subscriber.is_unsubscribed() {
                return Ok(());
            }
            subscriber.on_next(value);
        }
        subscriber.on_complete();
        Ok(())
    })
}

/// Complete immediately, with no `next` values.
pub fn empty<T>() -> Observable<T>
where
    T: Send + Sync + 'static,
{
    Observable::create(|subscriber: Subscriber<T>| {
        subscriber.on_complete();
        Ok(())
    })
}

/// Emit `error` immediately, with no `next` values.
pub fn error<T>(error: RxError) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    Observable::create(move |subscriber: Subscriber<T>| {
        subscriber.on_error(error.clone());
        Ok(())
    })
}

/// Emit `count` consecutive `i64`s starting at `start`, then complete.
pub fn range(start: i64, count: usize) -> Observable<i64> {
    Observable::create(move |subscriber: Subscriber<i64>| {
        for i in 0..count {
            if subscriber.is_unsubscribed() {
                return Ok(());
            }
            subscriber.on_next(start + i as i64);
        }
        subscriber.on_complete();
        Ok(())
    })
}

/// Build an observable directly from a raw subscribe function. Equivalent
/// to [`Observable::create`]; exists so callers can `use rx_operators::create`
/// alongside the other factories without naming the type.
pub fn create<T, F>(on_subscribe: F) -> Observable<T>
where
    T: Send + Sync + 'static,
    F: Fn(Subscriber<T>) -> rx_core::Result<()> + Send + Sync + 'static,
{
    Observable::create(on_subscribe)
}

/// Defer construction of the observable until subscribe time: `factory` is
/// invoked fresh for every subscription, so stateful sources don't share
/// state across subscribers.
pub fn defer<T, F>(factory: F) -> Observable<T>
where
    T: Send + Sync + 'static,
    F: Fn() -> Observable<T> + Send + Sync + 'static,
{
    Observable::create(move |subscriber: Subscriber<T>| {
        factory().subscribe_with(subscriber);
        Ok(())
    })
}

/// Emit an incrementing counter every `period`, starting after one `period`
/// has elapsed, on a worker of `scheduler`. Never completes on its own.
pub fn interval(period: Duration, scheduler: Arc<dyn Scheduler>) -> Observable<u64> {
    Observable::create(move |subscriber: Subscriber<u64>| {
        let worker = scheduler.create_worker();
        subscriber.add(worker.clone());
        let counter = Arc::new(AtomicU64::new(0));
        let sink = subscriber.clone();
        let action: RepeatableAction = Arc::new(move |_worker| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            sink.on_next(n);
        });
        let periodic = worker.schedule_periodic(action, period, period);
        subscriber.add(periodic);
        Ok(())
    })
}
