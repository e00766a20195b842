//! `zip`: pair up items across sources index-aligned, stopping at the
//! shortest.
//!
//! Each input gets its own FIFO of received items (a sentinel marks
//! "completed"); a single atomic "tick" counter arbitrates which thread
//! actually drains pending pairs so concurrent producers never interleave
//! emissions and no tick is ever lost: the counter is incremented on entry,
//! decremented at the end, and a thread that increments it from zero owns
//! the drain loop — every other entrant just deposits its item and returns.
//!
//! `zip2` is the representative binary case; higher arities follow the same
//! per-input-queue/single-drainer shape.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum Slot<T> {
    Value(T),
    Complete,
}

struct State<A, B> {
    queue_a: VecDeque<Slot<A>>,
    queue_b: VecDeque<Slot<B>>,
    terminated: bool,
}

enum Action<A, B> {
    Emit(A, B),
    Complete,
    None,
}

struct Ctx<A, B, C> {
    state: Mutex<State<A, B>>,
    pending: AtomicUsize,
    downstream: Subscriber<C>,
    combine: Arc<dyn Fn(A, B) -> C + Send + Sync>,
}

impl<A, B, C> Ctx<A, B, C> {
    /// Enter the tick protocol: if this call is the one that takes the
    /// pending count from 0, drain every currently-ready pair (and re-check
    /// after, in case another thread deposited more while we were
    /// emitting); otherwise a drain is already in progress and will see
    /// what we just pushed.
    fn tick(&self) {
        if self.pending.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            self.drain_ready();
            if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                break;
            }
        }
    }

    fn drain_ready(&self) {
        loop {
            let action = {
                let mut state = self.state.lock();
                if state.terminated {
                    break;
                }
                match (state.queue_a.front(), state.queue_b.front()) {
                    (Some(Slot::Complete), _) | (_, Some(Slot::Complete)) => {
                        state.terminated = true;
                        Action::Complete
                    }
                    (Some(Slot::Value(_)), Some(Slot::Value(_))) => {
                        let a = match state.queue_a.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        let b = match state.queue_b.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        Action::Emit(a, b)
                    }
                    _ => Action::None,
                }
            };
            match action {
                Action::Emit(a, b) => {
                    let combined = (self.combine)(a, b);
                    self.downstream.on_next(combined);
                }
                Action::Complete => {
                    self.downstream.on_complete();
                    break;
                }
                Action::None => break,
            }
        }
    }
}

/// Zip two observables: on each pair of arrivals, one from each side in the
/// order received, emit `combine(a, b)`. Stops (and unsubscribes both
/// sides) as soon as either side completes, even if the other still has
/// buffered values — output length is `min(len_a, len_b)`. An error from
/// either side propagates immediately.
pub fn zip2<A, B, C, F>(a: &Observable<A>, b: &Observable<B>, combine: F) -> Observable<C>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    let a = a.clone();
    let b = b.clone();
    let combine: Arc<dyn Fn(A, B) -> C + Send + Sync> = Arc::new(combine);

    Observable::create(move |downstream: Subscriber<C>| {
        let ctx = Arc::new(Ctx {
            state: Mutex::new(State {
                queue_a: VecDeque::new(),
                queue_b: VecDeque::new(),
                terminated: false,
            }),
            pending: AtomicUsize::new(0),
            downstream: downstream.clone(),
            combine: combine.clone(),
        });

        {
            let ctx_next = ctx.clone();
            let ctx_err = ctx.clone();
            let ctx_complete = ctx.clone();
            let observer: Arc<dyn Observer<A>> = Arc::new(FnObserver::new(
                move |value: A| {
                    ctx_next.state.lock().queue_a.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| ctx_err.downstream.on_error(error),
                move || {
                    ctx_complete.state.lock().queue_a.push_back(Slot::Complete);
                    ctx_complete.tick();
                },
            ));
            let sub = a.subscribe(observer);
            downstream.add(sub);
        }
        {
            let ctx_next = ctx.clone();
            let ctx_err = ctx.clone();
            let ctx_complete = ctx.clone();
            let observer: Arc<dyn Observer<B>> = Arc::new(FnObserver::new(
                move |value: B| {
                    ctx_next.state.lock().queue_b.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| ctx_err.downstream.on_error(error),
                move || {
                    ctx_complete.state.lock().queue_b.push_back(Slot::Complete);
                    ctx_complete.tick();
                },
            ));
            let sub = b.subscribe(observer);
            downstream.add(sub);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::from_iter;
    use parking_lot::Mutex as StdMutex;

    fn recording() -> (Arc<dyn Observer<String>>, Arc<StdMutex<Vec<String>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        let l3 = log.clone();
        let observer: Arc<dyn Observer<String>> = Arc::new(FnObserver::new(
            move |v: String| l1.lock().push(v),
            move |_e: RxError| l2.lock().push("error".to_string()),
            move || l3.lock().push("complete".to_string()),
        ));
        (observer, log)
    }

    #[test]
    fn output_length_is_min_of_inputs_index_aligned() {
        let a = from_iter(vec![1, 2, 3]);
        let b = from_iter(vec!["x".to_string(), "y".to_string()]);
        let zipped = zip2(&a, &b, |n: i32, s: String| format!("{n}{s}"));
        let (observer, log) = recording();
        zipped.subscribe(observer);
        assert_eq!(*log.lock(), vec!["1x", "2y", "complete"]);
    }

    #[test]
    fn error_on_either_side_propagates() {
        let a: Observable<i32> = crate::factory::error(RxError::stream("boom"));
        let b = from_iter(vec![1, 2, 3]);
        let zipped = zip2(&a, &b, |n: i32, m: i32| n + m);
        let (observer, log) = recording();
        zipped.subscribe(observer);
        assert_eq!(*log.lock(), vec!["error".to_string()]);
    }
}
