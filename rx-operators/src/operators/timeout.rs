//! `timeout` / `timeout_selector`: terminate (or fail over) a stream that
//! goes quiet for too long.
//!
//! Both operators share one shape: an `expected` version counter plus a
//! `terminated` latch, both behind one mutex. Every upstream signal and
//! every timeout window race to win that monitor — whichever gets there
//! first latches `terminated` and is the only one that ever reaches
//! downstream; the loser is silently dropped. `timeout` arms a scheduler
//! delay per window; `timeout_selector` arms a subscription to a per-window
//! observable and fires on its first value or its completion instead of a
//! fixed duration.

use crate::Observable;
use parking_lot::Mutex;
use rx_core::subscription::{serial, SerialSubscription, Subscription};
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use rx_runtime::{Action, Scheduler, Worker};
use std::sync::Arc;
use std::time::Duration;

struct State {
    expected: u64,
    terminated: bool,
}

/// Latch `terminated` if it isn't already set. Returns whether this call won.
fn terminate(state: &Mutex<State>) -> bool {
    let mut guard = state.lock();
    if guard.terminated {
        false
    } else {
        guard.terminated = true;
        true
    }
}

struct Ctx<T> {
    state: Mutex<State>,
    downstream: Subscriber<T>,
    worker: Arc<dyn Worker>,
    timer: Arc<SerialSubscription>,
    duration: Duration,
    fallback: Option<Observable<T>>,
    upstream_sub: Mutex<Option<Arc<dyn Subscription>>>,
}

fn advance<T>(ctx: &Ctx<T>) -> Option<u64> {
    let mut guard = ctx.state.lock();
    if guard.terminated {
        None
    } else {
        guard.expected = guard.expected.wrapping_add(1);
        Some(guard.expected)
    }
}

fn arm<T>(ctx: &Arc<Ctx<T>>, version: u64)
where
    T: Send + Sync + 'static,
{
    if ctx.state.lock().terminated {
        return;
    }
    let fire_ctx = ctx.clone();
    let action: Action = Box::new(move |_worker| {
        let win = {
            let mut guard = fire_ctx.state.lock();
            if guard.expected == version && !guard.terminated {
                guard.terminated = true;
                true
            } else {
                false
            }
        };
        if !win {
            return;
        }
        if let Some(upstream) = fire_ctx.upstream_sub.lock().clone() {
            upstream.unsubscribe();
        }
        match &fire_ctx.fallback {
            Some(fallback) => {
                fallback.clone().subscribe_with(fire_ctx.downstream.clone());
            }
            None => fire_ctx
                .downstream
                .on_error(RxError::timeout(format!("no signal within {:?}", fire_ctx.duration))),
        }
    });
    let sub = ctx.worker.schedule_after(action, ctx.duration);
    ctx.timer.set(sub);
}

/// Terminate `source` (or switch to `fallback`) if it goes `duration`
/// without a signal. A fresh window is armed on subscribe and after every
/// `next`; `fallback` of `None` delivers a timeout error instead of
/// switching sources.
pub fn timeout<T>(
    source: &Observable<T>,
    duration: Duration,
    scheduler: Arc<dyn Scheduler>,
    fallback: Option<Observable<T>>,
) -> Observable<T>
where
    T: Send + Sync + 'static,
{
    let source = source.clone();
    Observable::create(move |downstream: Subscriber<T>| {
        let worker = scheduler.create_worker();
        let worker_dyn: Arc<dyn Subscription> = worker.clone();
        downstream.add(worker_dyn);
        let timer = serial();
        let timer_dyn: Arc<dyn Subscription> = timer.clone();
        downstream.add(timer_dyn);

        let ctx = Arc::new(Ctx {
            state: Mutex::new(State {
                expected: 0,
                terminated: false,
            }),
            downstream: downstream.clone(),
            worker,
            timer,
            duration,
            fallback: fallback.clone(),
            upstream_sub: Mutex::new(None),
        });

        let next_ctx = ctx.clone();
        let error_ctx = ctx.clone();
        let complete_ctx = ctx.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| {
                if let Some(version) = advance(&next_ctx) {
                    arm(&next_ctx, version);
                    next_ctx.downstream.on_next(value);
                }
            },
            move |error: RxError| {
                if terminate(&error_ctx.state) {
                    error_ctx.timer.unsubscribe();
                    error_ctx.downstream.on_error(error);
                }
            },
            move || {
                if terminate(&complete_ctx.state) {
                    complete_ctx.timer.unsubscribe();
                    complete_ctx.downstream.on_complete();
                }
            },
        ));
        let upstream_subscriber = Subscriber::new(observer);
        let upstream_composite: Arc<dyn Subscription> = upstream_subscriber.subscription();
        downstream.add(upstream_composite.clone());
        *ctx.upstream_sub.lock() = Some(upstream_composite);
        source.subscribe_with(upstream_subscriber);

        let version = advance(&ctx).unwrap_or(1);
        arm(&ctx, version);
        Ok(())
    })
}

struct SelectorCtx<T, U> {
    state: Mutex<State>,
    downstream: Subscriber<T>,
    watcher: Arc<SerialSubscription>,
    selector: Arc<dyn Fn(Option<&T>) -> Observable<U> + Send + Sync>,
    fallback: Option<Observable<T>>,
    upstream_sub: Mutex<Option<Arc<dyn Subscription>>>,
}

fn fire_selector<T, U>(ctx: &Arc<SelectorCtx<T, U>>, version: u64, error: Option<RxError>)
where
    T: Send + Sync + 'static,
{
    let win = {
        let mut guard = ctx.state.lock();
        if guard.expected == version && !guard.terminated {
            guard.terminated = true;
            true
        } else {
            false
        }
    };
    if !win {
        return;
    }
    if let Some(upstream) = ctx.upstream_sub.lock().clone() {
        upstream.unsubscribe();
    }
    if let Some(error) = error {
        ctx.downstream.on_error(error);
        return;
    }
    match &ctx.fallback {
        Some(fallback) => {
            fallback.clone().subscribe_with(ctx.downstream.clone());
        }
        None => ctx
            .downstream
            .on_error(RxError::timeout("timeout-selector window elapsed")),
    }
}

fn arm_selector<T, U>(ctx: &Arc<SelectorCtx<T, U>>, version: u64, hint: Option<&T>)
where
    T: Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    if ctx.state.lock().terminated {
        return;
    }
    let window = (ctx.selector)(hint);
    let fire_next = ctx.clone();
    let fire_error = ctx.clone();
    let fire_complete = ctx.clone();
    let observer: Arc<dyn Observer<U>> = Arc::new(FnObserver::new(
        move |_value: U| fire_selector(&fire_next, version, None),
        move |error: RxError| fire_selector(&fire_error, version, Some(error)),
        move || fire_selector(&fire_complete, version, None),
    ));
    let sub = window.subscribe(observer);
    ctx.watcher.set(sub);
}

/// Like [`timeout`], but each window is an observable produced by
/// `selector` rather than a fixed duration: `selector(None)` builds the
/// initial window, `selector(Some(last_item))` builds the window following
/// each `next`. The window "fires" on its first value or its completion.
pub fn timeout_selector<T, U, F>(
    source: &Observable<T>,
    selector: F,
    fallback: Option<Observable<T>>,
) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
    U: Send + Sync + 'static,
    F: Fn(Option<&T>) -> Observable<U> + Send + Sync + 'static,
{
    let source = source.clone();
    let selector: Arc<dyn Fn(Option<&T>) -> Observable<U> + Send + Sync> = Arc::new(selector);

    Observable::create(move |downstream: Subscriber<T>| {
        let watcher = serial();
        let watcher_dyn: Arc<dyn Subscription> = watcher.clone();
        downstream.add(watcher_dyn);

        let ctx = Arc::new(SelectorCtx {
            state: Mutex::new(State {
                expected: 0,
                terminated: false,
            }),
            downstream: downstream.clone(),
            watcher,
            selector: selector.clone(),
            fallback: fallback.clone(),
            upstream_sub: Mutex::new(None),
        });

        let next_ctx = ctx.clone();
        let error_ctx = ctx.clone();
        let complete_ctx = ctx.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| {
                let version = advance(&next_ctx);
                if let Some(version) = version {
                    arm_selector(&next_ctx, version, Some(&value));
                    next_ctx.downstream.on_next(value);
                }
            },
            move |error: RxError| {
                if terminate(&error_ctx.state) {
                    error_ctx.watcher.unsubscribe();
                    error_ctx.downstream.on_error(error);
                }
            },
            move || {
                if terminate(&complete_ctx.state) {
                    complete_ctx.watcher.unsubscribe();
                    complete_ctx.downstream.on_complete();
                }
            },
        ));
        let upstream_subscriber = Subscriber::new(observer);
        let upstream_composite: Arc<dyn Subscription> = upstream_subscriber.subscription();
        downstream.add(upstream_composite.clone());
        *ctx.upstream_sub.lock() = Some(upstream_composite);
        source.subscribe_with(upstream_subscriber);

        let version = advance(&ctx).unwrap_or(1);
        arm_selector(&ctx, version, None);
        Ok(())
    })
}
