//! `retry`: resubscribe to the source on error, a bounded number of times
//! or unboundedly.
//!
//! Resubscription happens through the trampoline scheduler so a source that
//! fails immediately, over and over, unwinds iteratively rather than
//! recursing the call stack. Each attempt gets its
//! own fresh [`Subscriber`], held in a [`SerialSubscription`] child of
//! downstream's composite, so cancelling downstream tears down whichever
//! attempt is currently in flight without the attempt's own terminal
//! `on_error` (which would otherwise unsubscribe a shared composite)
//! prematurely cancelling the retry loop itself.

use crate::Observable;
use rx_core::subscription::{serial, SerialSubscription, Subscription};
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use rx_runtime::{Schedulers, Worker};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

struct Ctx<T> {
    source: Observable<T>,
    downstream: Subscriber<T>,
    max_attempts: i64,
    attempts: AtomicI64,
    worker: Arc<dyn Worker>,
    serial: Arc<SerialSubscription>,
}

fn subscribe_once<T>(ctx: Arc<Ctx<T>>)
where
    T: Send + Sync + 'static,
{
    let next_ctx = ctx.clone();
    let error_ctx = ctx.clone();
    let complete_ctx = ctx.clone();
    let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
        move |value: T| next_ctx.downstream.on_next(value),
        move |error: RxError| {
            let should_retry = if error_ctx.max_attempts == -1 {
                true
            } else {
                let used = error_ctx.attempts.fetch_add(1, Ordering::SeqCst);
                used < error_ctx.max_attempts
            };
            if should_retry {
                let retry_ctx = error_ctx.clone();
                error_ctx
                    .worker
                    .schedule(Box::new(move |_worker| subscribe_once(retry_ctx)));
            } else {
                error_ctx.downstream.on_error(error);
            }
        },
        move || complete_ctx.downstream.on_complete(),
    ));
    let subscriber = Subscriber::new(observer);
    let composite: Arc<dyn Subscription> = subscriber.subscription();
    ctx.serial.set(composite);
    ctx.source.subscribe_with(subscriber);
}

/// Resubscribe to `source` on error. `max_attempts` is the number of
/// resubscriptions allowed after the first failure: `-1` means unbounded,
/// any other negative value is a construction-time misuse error. On
/// `complete`, or once attempts are exhausted, the terminal signal is
/// forwarded downstream and no further resubscription happens.
///
/// # Panics
/// Panics if `max_attempts` is negative and not `-1`, fail fast at
/// construction rather than silently treating it as zero attempts.
pub fn retry<T>(source: &Observable<T>, max_attempts: i64) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    assert!(
        max_attempts == -1 || max_attempts >= 0,
        "retry: max_attempts must be -1 (unbounded) or non-negative"
    );
    let source = source.clone();

    Observable::create(move |downstream: Subscriber<T>| {
        let worker = Schedulers::trampoline().create_worker();
        let retry_serial = serial();
        let serial_dyn: Arc<dyn Subscription> = retry_serial.clone();
        downstream.add(serial_dyn);

        let ctx = Arc::new(Ctx {
            source: source.clone(),
            downstream: downstream.clone(),
            max_attempts,
            attempts: AtomicI64::new(0),
            worker,
            serial: retry_serial,
        });
        subscribe_once(ctx);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn flaky_then_succeeds(fail_times: usize) -> Observable<i32> {
        let attempt = Arc::new(AtomicUsize::new(0));
        Observable::create(move |subscriber: Subscriber<i32>| {
            let n = attempt.fetch_add(1, Ordering::SeqCst);
            if n < fail_times {
                subscriber.on_error(RxError::stream("transient"));
            } else {
                subscriber.on_next(42);
                subscriber.on_complete();
            }
            Ok(())
        })
    }

    #[test]
    fn retries_up_to_the_limit_then_succeeds() {
        let source = flaky_then_succeeds(2);
        let retried = retry(&source, 5);
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |v: i32| l1.lock().push(format!("next({v})")),
            |_e: RxError| {},
            move || l2.lock().push("complete".to_string()),
        ));
        retried.subscribe(observer);
        assert_eq!(*log.lock(), vec!["next(42)", "complete"]);
    }

    #[test]
    fn forwards_error_once_attempts_are_exhausted() {
        let source = flaky_then_succeeds(10);
        let retried = retry(&source, 2);
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            |_v: i32| {},
            move |_e: RxError| l.lock().push("error".to_string()),
            || {},
        ));
        retried.subscribe(observer);
        assert_eq!(*log.lock(), vec!["error".to_string()]);
    }

    #[test]
    #[should_panic(expected = "max_attempts")]
    fn negative_non_sentinel_attempts_panics_at_construction() {
        let source = flaky_then_succeeds(0);
        retry(&source, -2);
    }
}
