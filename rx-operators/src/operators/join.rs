//! `join`: fire a combiner once every input has a queued item, consuming one
//! from each atomically.
//!
//! A [`Plan`] is the piece every input's join-observer shares: the downstream
//! subscriber and a single termination latch, so whichever input completes
//! or errors first is the only one that ever reaches downstream. Each join
//! function (`join2`, `join3`, ...) owns its own typed per-input queues —
//! unlike a dynamic registry where a plan and its join-observers would need
//! to reference each other by id to avoid a reference cycle, a fixed-arity
//! plan's observers only ever point at the one plan that created them, so
//! no back-reference and no arena is needed to break a cycle that cannot
//! form.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared state behind an activated join: the downstream subscriber every
/// input's join-observer delivers into, and a latch ensuring only the first
/// terminal signal (from any input) is ever forwarded.
pub struct Plan<T> {
    downstream: Subscriber<T>,
    terminated: AtomicBool,
}

impl<T> Plan<T> {
    fn new(downstream: Subscriber<T>) -> Arc<Self> {
        Arc::new(Plan {
            downstream,
            terminated: AtomicBool::new(false),
        })
    }

    /// Latch termination. Returns `true` if this call is the one that won
    /// the race — the only caller allowed to deliver a terminal signal.
    fn terminate_once(&self) -> bool {
        self.terminated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

enum Slot<T> {
    Value(T),
    Done,
}

struct State2<A, B> {
    a: VecDeque<Slot<A>>,
    b: VecDeque<Slot<B>>,
}

struct Ctx2<A, B, Out> {
    plan: Arc<Plan<Out>>,
    state: Mutex<State2<A, B>>,
    pending: AtomicUsize,
    combine: Arc<dyn Fn(A, B) -> Out + Send + Sync>,
}

impl<A, B, Out> Ctx2<A, B, Out> {
    fn tick(self: &Arc<Self>) {
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

    fn drain_ready(self: &Arc<Self>) {
        loop {
            if self.plan.is_terminated() {
                return;
            }
            let fired = {
                let mut state = self.state.lock();
                match (state.a.front(), state.b.front()) {
                    (Some(Slot::Done), _) | (_, Some(Slot::Done)) => None,
                    (Some(Slot::Value(_)), Some(Slot::Value(_))) => {
                        let a = match state.a.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        let b = match state.b.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        Some(Some((a, b)))
                    }
                    _ => Some(None),
                }
            };
            match fired {
                None => {
                    if self.plan.terminate_once() {
                        self.plan.downstream.on_complete();
                    }
                    return;
                }
                Some(None) => return,
                Some(Some((a, b))) => {
                    let combined = (self.combine)(a, b);
                    self.plan.downstream.on_next(combined);
                }
            }
        }
    }
}

/// Join two observables: once every input has at least one queued item,
/// consume one from each (in arrival order) and emit `combine(a, b)`. As
/// soon as any input completes with nothing left queued, or errors, the
/// join completes or errors — whichever input gets there first wins, and
/// it's the only one whose terminal signal is forwarded.
pub fn join2<A, B, Out, F>(a: &Observable<A>, b: &Observable<B>, combine: F) -> Observable<Out>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    Out: Send + Sync + 'static,
    F: Fn(A, B) -> Out + Send + Sync + 'static,
{
    let a = a.clone();
    let b = b.clone();
    let combine: Arc<dyn Fn(A, B) -> Out + Send + Sync> = Arc::new(combine);

    Observable::create(move |downstream: Subscriber<Out>| {
        let plan = Plan::new(downstream.clone());
        let ctx = Arc::new(Ctx2 {
            plan: plan.clone(),
            state: Mutex::new(State2 {
                a: VecDeque::new(),
                b: VecDeque::new(),
            }),
            pending: AtomicUsize::new(0),
            combine: combine.clone(),
        });

        {
            let ctx_next = ctx.clone();
            let ctx_complete = ctx.clone();
            let plan_err = plan.clone();
            let observer: Arc<dyn Observer<A>> = Arc::new(FnObserver::new(
                move |value: A| {
                    ctx_next.state.lock().a.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| {
                    if plan_err.terminate_once() {
                        plan_err.downstream.on_error(error);
                    }
                },
                move || {
                    ctx_complete.state.lock().a.push_back(Slot::Done);
                    ctx_complete.tick();
                },
            ));
            let sub = a.subscribe(observer);
            downstream.add(sub);
        }
        {
            let ctx_next = ctx.clone();
            let ctx_complete = ctx.clone();
            let plan_err = plan.clone();
            let observer: Arc<dyn Observer<B>> = Arc::new(FnObserver::new(
                move |value: B| {
                    ctx_next.state.lock().b.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| {
                    if plan_err.terminate_once() {
                        plan_err.downstream.on_error(error);
                    }
                },
                move || {
                    ctx_complete.state.lock().b.push_back(Slot::Done);
                    ctx_complete.tick();
                },
            ));
            let sub = b.subscribe(observer);
            downstream.add(sub);
        }
        Ok(())
    })
}

struct State3<A, B, C> {
    a: VecDeque<Slot<A>>,
    b: VecDeque<Slot<B>>,
    c: VecDeque<Slot<C>>,
}

struct Ctx3<A, B, C, Out> {
    plan: Arc<Plan<Out>>,
    state: Mutex<State3<A, B, C>>,
    pending: AtomicUsize,
    combine: Arc<dyn Fn(A, B, C) -> Out + Send + Sync>,
}

impl<A, B, C, Out> Ctx3<A, B, C, Out> {
    fn tick(self: &Arc<Self>) {
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

    fn drain_ready(self: &Arc<Self>) {
        loop {
            if self.plan.is_terminated() {
                return;
            }
            let fired = {
                let mut state = self.state.lock();
                match (state.a.front(), state.b.front(), state.c.front()) {
                    (Some(Slot::Done), _, _) | (_, Some(Slot::Done), _) | (_, _, Some(Slot::Done)) => None,
                    (Some(Slot::Value(_)), Some(Slot::Value(_)), Some(Slot::Value(_))) => {
                        let a = match state.a.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        let b = match state.b.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        let c = match state.c.pop_front() {
                            Some(Slot::Value(v)) => v,
                            _ => unreachable!("front peeked as Value"),
                        };
                        Some(Some((a, b, c)))
                    }
                    _ => Some(None),
                }
            };
            match fired {
                None => {
                    if self.plan.terminate_once() {
                        self.plan.downstream.on_complete();
                    }
                    return;
                }
                Some(None) => return,
                Some(Some((a, b, c))) => {
                    let combined = (self.combine)(a, b, c);
                    self.plan.downstream.on_next(combined);
                }
            }
        }
    }
}

/// Three-input counterpart of [`join2`]; same semantics, one more queue.
pub fn join3<A, B, C, Out, F>(
    a: &Observable<A>,
    b: &Observable<B>,
    c: &Observable<C>,
    combine: F,
) -> Observable<Out>
where
    A: Send + Sync + 'static,
    B: Send + Sync + 'static,
    C: Send + Sync + 'static,
    Out: Send + Sync + 'static,
    F: Fn(A, B, C) -> Out + Send + Sync + 'static,
{
    let a = a.clone();
    let b = b.clone();
    let c = c.clone();
    let combine: Arc<dyn Fn(A, B, C) -> Out + Send + Sync> = Arc::new(combine);

    Observable::create(move |downstream: Subscriber<Out>| {
        let plan = Plan::new(downstream.clone());
        let ctx = Arc::new(Ctx3 {
            plan: plan.clone(),
            state: Mutex::new(State3 {
                a: VecDeque::new(),
                b: VecDeque::new(),
                c: VecDeque::new(),
            }),
            pending: AtomicUsize::new(0),
            combine: combine.clone(),
        });

        {
            let ctx_next = ctx.clone();
            let ctx_complete = ctx.clone();
            let plan_err = plan.clone();
            let observer: Arc<dyn Observer<A>> = Arc::new(FnObserver::new(
                move |value: A| {
                    ctx_next.state.lock().a.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| {
                    if plan_err.terminate_once() {
                        plan_err.downstream.on_error(error);
                    }
                },
                move || {
                    ctx_complete.state.lock().a.push_back(Slot::Done);
                    ctx_complete.tick();
                },
            ));
            let sub = a.subscribe(observer);
            downstream.add(sub);
        }
        {
            let ctx_next = ctx.clone();
            let ctx_complete = ctx.clone();
            let plan_err = plan.clone();
            let observer: Arc<dyn Observer<B>> = Arc::new(FnObserver::new(
                move |value: B| {
                    ctx_next.state.lock().b.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| {
                    if plan_err.terminate_once() {
                        plan_err.downstream.on_error(error);
                    }
                },
                move || {
                    ctx_complete.state.lock().b.push_back(Slot::Done);
                    ctx_complete.tick();
                },
            ));
            let sub = b.subscribe(observer);
            downstream.add(sub);
        }
        {
            let ctx_next = ctx.clone();
            let ctx_complete = ctx.clone();
            let plan_err = plan.clone();
            let observer: Arc<dyn Observer<C>> = Arc::new(FnObserver::new(
                move |value: C| {
                    ctx_next.state.lock().c.push_back(Slot::Value(value));
                    ctx_next.tick();
                },
                move |error: RxError| {
                    if plan_err.terminate_once() {
                        plan_err.downstream.on_error(error);
                    }
                },
                move || {
                    ctx_complete.state.lock().c.push_back(Slot::Done);
                    ctx_complete.tick();
                },
            ));
            let sub = c.subscribe(observer);
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
    fn fires_once_per_complete_set_of_heads() {
        let a = from_iter(vec![1, 2, 3]);
        let b = from_iter(vec!["x".to_string(), "y".to_string()]);
        let joined = join2(&a, &b, |n: i32, s: String| format!("{n}{s}"));
        let (observer, log) = recording();
        joined.subscribe(observer);
        assert_eq!(*log.lock(), vec!["1x", "2y", "complete"]);
    }

    #[test]
    fn error_on_any_input_tears_down_the_plan() {
        let a: Observable<i32> = crate::factory::error(RxError::stream("boom"));
        let b = from_iter(vec![1, 2, 3]);
        let joined = join2(&a, &b, |n: i32, m: i32| format!("{}", n + m));
        let (observer, log) = recording();
        joined.subscribe(observer);
        assert_eq!(*log.lock(), vec!["error".to_string()]);
    }

    #[test]
    fn three_way_join_aligns_all_heads() {
        let a = from_iter(vec![1, 2]);
        let b = from_iter(vec![10, 20]);
        let c = from_iter(vec![100, 200]);
        let joined = join3(&a, &b, &c, |x: i32, y: i32, z: i32| format!("{}", x + y + z));
        let (observer, log) = recording();
        joined.subscribe(observer);
        assert_eq!(*log.lock(), vec!["111", "222", "complete"]);
    }
}
