//! Representative unary transforms. `map`/`filter`/`take`/`take_until`/
//! `combine_latest` stand in for the wide catalog of trivial operators not
//! otherwise singled out for their own module.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn noop_observer<T: 'static>() -> Arc<dyn Observer<T>> {
    Arc::new(FnObserver::new(|_: T| {}, |_: RxError| {}, || {}))
}

/// Apply `f` to every value; errors from `f` are delivered downstream and
/// cancel upstream.
pub fn map<T, U, F>(source: &Observable<T>, f: F) -> Observable<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    try_map(source, move |value| Ok(f(value)))
}

/// Like [`map`], but `f` may fail; an `Err` is delivered as `on_error` and
/// upstream is unsubscribed.
pub fn try_map<T, U, F>(source: &Observable<T>, f: F) -> Observable<U>
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(T) -> rx_core::Result<U> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    source.lift(move |downstream: Subscriber<U>| {
        let down_next = downstream.clone();
        let down_error = downstream.clone();
        let down_complete = downstream.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| match f(value) {
                Ok(mapped) => down_next.on_next(mapped),
                Err(error) => down_next.on_error(error),
            },
            move |error: RxError| down_error.on_error(error),
            move || down_complete.on_complete(),
        ));
        Subscriber::from_parent(&downstream, observer)
    })
}

/// Forward only values for which `predicate` holds.
pub fn filter<T, F>(source: &Observable<T>, predicate: F) -> Observable<T>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    source.lift(move |downstream: Subscriber<T>| {
        let down_next = downstream.clone();
        let down_error = downstream.clone();
        let down_complete = downstream.clone();
        let predicate = predicate.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| {
                if predicate(&value) {
                    down_next.on_next(value);
                }
            },
            move |error: RxError| down_error.on_error(error),
            move || down_complete.on_complete(),
        ));
        Subscriber::from_parent(&downstream, observer)
    })
}

/// Forward at most the first `count` values, then complete and unsubscribe
/// upstream.
///
/// `take(0)` must not let the source's subscribe become observable: the
/// shared composite is unsubscribed, and downstream completed, before the
/// source's own `on_subscribe` runs at all.
pub fn take<T>(source: &Observable<T>, count: usize) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    source.lift(move |downstream: Subscriber<T>| {
        if count == 0 {
            downstream.on_complete();
            downstream.unsubscribe();
            return Subscriber::from_parent(&downstream, noop_observer());
        }

        let remaining = Arc::new(AtomicUsize::new(count));
        let down_next = downstream.clone();
        let down_error = downstream.clone();
        let down_complete = downstream.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| {
                let outcome = remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    if n == 0 {
                        None
                    } else {
                        Some(n - 1)
                    }
                });
                let Ok(previous) = outcome else { return };
                down_next.on_next(value);
                if previous == 1 {
                    down_next.on_complete();
                    down_next.unsubscribe();
                }
            },
            move |error: RxError| down_error.on_error(error),
            move || down_complete.on_complete(),
        ));
        Subscriber::from_parent(&downstream, observer)
    })
}

/// Forward values from `source` until `notifier` emits its first value or
/// terminates, at which point downstream completes and upstream is
/// unsubscribed.
pub fn take_until<T, N>(source: &Observable<T>, notifier: Observable<N>) -> Observable<T>
where
    T: Send + Sync + 'static,
    N: Send + Sync + 'static,
{
    source.lift(move |downstream: Subscriber<T>| {
        let upstream = Subscriber::from_parent(&downstream, {
            let down_next = downstream.clone();
            let down_error = downstream.clone();
            let down_complete = downstream.clone();
            let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
                move |value: T| down_next.on_next(value),
                move |error: RxError| down_error.on_error(error),
                move || down_complete.on_complete(),
            ));
            observer
        });

        let notify_sink = downstream.clone();
        let notifier_observer: Arc<dyn Observer<N>> = Arc::new(FnObserver::new(
            move |_value: N| {
                notify_sink.on_complete();
                notify_sink.unsubscribe();
            },
            {
                let sink = downstream.clone();
                move |_error: RxError| {
                    sink.on_complete();
                    sink.unsubscribe();
                }
            },
            {
                let sink = downstream.clone();
                move || {
                    sink.on_complete();
                    sink.unsubscribe();
                }
            },
        ));
        let notifier_sub = notifier.subscribe(notifier_observer);
        downstream.add(notifier_sub);

        upstream
    })
}

/// Combine the most recent value from each of two sources: every time
/// either emits, once both have produced at least one value, re-emit
/// `combine(latest_a, latest_b)`. Terminates when both sources have
/// completed, or immediately on either's error.
pub fn combine_latest<A, B, C, F>(
    a: &Observable<A>,
    b: &Observable<B>,
    combine: F,
) -> Observable<C>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    let a = a.clone();
    let b = b.clone();
    let combine = Arc::new(combine);

    Observable::create(move |downstream: Subscriber<C>| {
        let latest_a: Arc<Mutex<Option<A>>> = Arc::new(Mutex::new(None));
        let latest_b: Arc<Mutex<Option<B>>> = Arc::new(Mutex::new(None));
        let completed = Arc::new(AtomicUsize::new(0));
        let synchronizer = Arc::new(Mutex::new(()));

        {
            let down = downstream.clone();
            let combine = combine.clone();
            let latest_a = latest_a.clone();
            let latest_b = latest_b.clone();
            let completed = completed.clone();
            let synchronizer = synchronizer.clone();
            let observer: Arc<dyn Observer<A>> = Arc::new(FnObserver::new(
                move |value: A| {
                    let _guard = synchronizer.lock();
                    *latest_a.lock() = Some(value.clone());
                    if let Some(b_value) = latest_b.lock().clone() {
                        down.on_next(combine(value, b_value));
                    }
                },
                {
                    let down = downstream.clone();
                    move |error: RxError| down.on_error(error)
                },
                {
                    let down = downstream.clone();
                    let completed = completed.clone();
                    move || {
                        if completed.fetch_add(1, Ordering::SeqCst) == 1 {
                            down.on_complete();
                        }
                    }
                },
            ));
            let sub_a = a.subscribe(observer);
            downstream.add(sub_a);
        }
        {
            let down = downstream.clone();
            let combine = combine.clone();
            let observer: Arc<dyn Observer<B>> = Arc::new(FnObserver::new(
                move |value: B| {
                    let _guard = synchronizer.lock();
                    *latest_b.lock() = Some(value.clone());
                    if let Some(a_value) = latest_a.lock().clone() {
                        down.on_next(combine(a_value, value));
                    }
                },
                {
                    let down = downstream.clone();
                    move |error: RxError| down.on_error(error)
                },
                {
                    let down = downstream.clone();
                    let completed = completed.clone();
                    move || {
                        if completed.fetch_add(1, Ordering::SeqCst) == 1 {
                            down.on_complete();
                        }
                    }
                },
            ));
            let sub_b = b.subscribe(observer);
            downstream.add(sub_b);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::from_iter;
    use parking_lot::Mutex as StdMutex;

    fn recording<T: 'static>() -> (Arc<dyn Observer<T>>, Arc<StdMutex<Vec<String>>>)
    where
        T: std::fmt::Debug,
    {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        let l3 = log.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |v: T| l1.lock().push(format!("next({v:?})")),
            move |_e: RxError| l2.lock().push("error".to_string()),
            move || l3.lock().push("complete".to_string()),
        ));
        (observer, log)
    }

    #[test]
    fn map_transforms_every_value() {
        let source = from_iter(vec![1, 2, 3]);
        let mapped = map(&source, |v| v * 10);
        let (observer, log) = recording();
        mapped.subscribe(observer);
        assert_eq!(*log.lock(), vec!["next(10)", "next(20)", "next(30)", "complete"]);
    }

    #[test]
    fn filter_drops_nonmatching_values() {
        let source = from_iter(vec![1, 2, 3, 4]);
        let evens = filter(&source, |v| v % 2 == 0);
        let (observer, log) = recording();
        evens.subscribe(observer);
        assert_eq!(*log.lock(), vec!["next(2)", "next(4)", "complete"]);
    }

    #[test]
    fn take_stops_after_count_and_unsubscribes_upstream() {
        let source = from_iter(0..100);
        let first_two = take(&source, 2);
        let (observer, log) = recording();
        first_two.subscribe(observer);
        assert_eq!(*log.lock(), vec!["next(0)", "next(1)", "complete"]);
    }

    #[test]
    fn take_zero_never_observes_a_value() {
        let source = from_iter(vec![1, 2, 3]);
        let none = take(&source, 0);
        let (observer, log) = recording();
        none.subscribe(observer);
        assert_eq!(*log.lock(), vec!["complete"]);
    }

    #[test]
    fn combine_latest_waits_for_both_then_pairs_updates() {
        let a = from_iter(vec![1, 2]);
        let b = from_iter(vec!["x".to_string()]);
        let combined = combine_latest(&a, &b, |n: i32, s: String| format!("{n}{s}"));
        let (observer, log) = recording();
        combined.subscribe(observer);
        let entries = log.lock();
        assert!(entries.contains(&"next(\"1x\")".to_string()) || entries.contains(&"next(\"2x\")".to_string()));
    }
}
