//! `merge`: flatten an observable-of-observables into one stream.
//!
//! Tracks two counters behind a single mutex rather than a pair of separate
//! atomics: a *completion* count (outer + every inner that has arrived,
//! queued or active) and a *concurrent* count (inners currently subscribed).
//! Folding both into one lock makes the "drain one from the queue on
//! completion" step linearizable by construction instead of by careful
//! atomic ordering.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use std::collections::VecDeque;
use std::sync::Arc;

struct State<T> {
    concurrent: usize,
    completion: usize,
    max: Option<usize>,
    queue: VecDeque<Observable<T>>,
}

impl<T> State<T> {
    fn on_inner_arrived(&mut self, inner: Observable<T>) -> Option<Observable<T>> {
        self.completion += 1;
        match self.max {
            Some(max) if self.concurrent >= max => {
                self.queue.push_back(inner);
                None
            }
            _ => {
                self.concurrent += 1;
                Some(inner)
            }
        }
    }

    /// Returns the next inner to subscribe (if one was queued) and whether
    /// the whole merge has now completed.
    fn on_inner_complete(&mut self) -> (Option<Observable<T>>, bool) {
        self.concurrent -= 1;
        let next = self.queue.pop_front();
        if next.is_some() {
            self.concurrent += 1;
        }
        self.completion -= 1;
        (next, self.completion == 0)
    }

    fn on_outer_complete(&mut self) -> bool {
        self.completion -= 1;
        self.completion == 0
    }
}

struct Ctx<T> {
    downstream: Subscriber<T>,
    state: Mutex<State<T>>,
}

fn spawn_inner<T>(ctx: Arc<Ctx<T>>, inner: Observable<T>)
where
    T: Send + Sync + 'static,
{
    let next_ctx = ctx.clone();
    let complete_ctx = ctx.clone();
    let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
        move |value: T| ctx.downstream.on_next(value),
        {
            let ctx = next_ctx.clone();
            move |error: RxError| ctx.downstream.on_error(error)
        },
        move || {
            let (next, done) = complete_ctx.state.lock().on_inner_complete();
            if let Some(next_inner) = next {
                spawn_inner(complete_ctx.clone(), next_inner);
            }
            if done {
                complete_ctx.downstream.on_complete();
            }
        },
    ));
    let sub = inner.subscribe(observer);
    next_ctx.downstream.add(sub);
}

/// Flatten `source`, an observable of observables, into a single stream.
///
/// With `max_concurrent = None`, every inner subscribes as soon as it
/// arrives. With `Some(n)`, at most `n` inners are subscribed at once;
/// later arrivals queue FIFO and are subscribed as earlier ones complete.
/// The outer completing does not terminate downstream until every inner
/// (subscribed or still queued) has also completed. An error from any inner
/// — or from the outer — propagates immediately and, via the shared
/// composite, cancels every other inner.
///
/// # Panics
/// Panics if `max_concurrent` is `Some(0)` — fail fast at construction
/// rather than silently admitting zero inners ever.
pub fn merge<T>(source: &Observable<Observable<T>>, max_concurrent: Option<usize>) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    assert_ne!(
        max_concurrent,
        Some(0),
        "merge: max_concurrent must be greater than zero"
    );

    let source = source.clone();
    Observable::create(move |downstream: Subscriber<T>| {
        let downstream = downstream.synchronized();
        let ctx = Arc::new(Ctx {
            downstream: downstream.clone(),
            state: Mutex::new(State {
                concurrent: 0,
                completion: 1,
                max: max_concurrent,
                queue: VecDeque::new(),
            }),
        });

        let arrive_ctx = ctx.clone();
        let error_ctx = ctx.clone();
        let complete_ctx = ctx.clone();
        let outer_observer: Arc<dyn Observer<Observable<T>>> = Arc::new(FnObserver::new(
            move |inner: Observable<T>| {
                let to_subscribe = arrive_ctx.state.lock().on_inner_arrived(inner);
                if let Some(inner) = to_subscribe {
                    spawn_inner(arrive_ctx.clone(), inner);
                }
            },
            move |error: RxError| error_ctx.downstream.on_error(error),
            move || {
                let done = complete_ctx.state.lock().on_outer_complete();
                if done {
                    complete_ctx.downstream.on_complete();
                }
            },
        ));
        let outer_subscriber = Subscriber::from_parent(&downstream, outer_observer);
        source.subscribe_with(outer_subscriber);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::from_iter;
    use parking_lot::Mutex as StdMutex;
    use rx_core::FnObserver;
    use std::collections::HashSet;

    fn recording() -> (Arc<dyn Observer<i32>>, Arc<StdMutex<Vec<i32>>>, Arc<StdMutex<Vec<String>>>) {
        let values = Arc::new(StdMutex::new(Vec::new()));
        let signals = Arc::new(StdMutex::new(Vec::new()));
        let v = values.clone();
        let s1 = signals.clone();
        let s2 = signals.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |x: i32| v.lock().push(x),
            move |_e: RxError| s1.lock().push("error".into()),
            move || s2.lock().push("complete".into()),
        ));
        (observer, values, signals)
    }

    #[test]
    fn merges_all_inners_preserving_per_inner_order() {
        let inners = from_iter(vec![from_iter(vec![1, 2]), from_iter(vec![3, 4])]);
        let merged = merge(&inners, None);
        let (observer, values, signals) = recording();
        merged.subscribe(observer);

        let seen: HashSet<i32> = values.lock().iter().copied().collect();
        assert_eq!(seen, HashSet::from([1, 2, 3, 4]));
        assert_eq!(*signals.lock(), vec!["complete".to_string()]);
    }

    #[test]
    fn inner_error_propagates_and_cancels_the_rest() {
        let failing: Observable<i32> = crate::factory::error(RxError::stream("boom"));
        let inners = from_iter(vec![failing, from_iter(vec![1, 2, 3])]);
        let merged = merge(&inners, None);
        let (observer, _values, signals) = recording();
        merged.subscribe(observer);
        assert_eq!(*signals.lock(), vec!["error".to_string()]);
    }

    #[test]
    #[should_panic(expected = "max_concurrent")]
    fn zero_max_concurrent_panics_at_construction() {
        let inners: Observable<Observable<i32>> = from_iter(Vec::new());
        merge(&inners, Some(0));
    }
}
