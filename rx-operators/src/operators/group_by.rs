//! `group_by`: partition a stream into per-key sub-streams.
//!
//! Each key gets a [`PublishSubject`] created the first time that key is
//! seen; the outer stream emits a [`GroupedObservable`] wrapping it at that
//! moment, and every later item for the same key is forwarded into the
//! existing subject. Upstream completion/error is forwarded to every live
//! group's subject and then to the outer — a single synchronous terminal
//! event, since a `group_by` source only ever terminates once. If the outer
//! subscriber has already unsubscribed, no further groups are created, but
//! groups already handed out keep forwarding until their own subscribers
//! unsubscribe (their subjects are independent of the outer's composite).

use crate::Observable;
use parking_lot::Mutex;
use rx_core::subject::PublishSubject;
use rx_core::{FnObserver, Observer, RxError, Subscriber};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A per-key sub-stream handed out by [`group_by`]. Dereferences to the
/// underlying [`Observable`] so it can be subscribed or further composed
/// directly; [`GroupedObservable::key`] recovers the key it was created for.
pub struct GroupedObservable<K, T> {
    key: K,
    source: Observable<T>,
}

impl<K, T> GroupedObservable<K, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(key: K, subject: PublishSubject<T>) -> Self {
        let source = Observable::create(move |subscriber: Subscriber<T>| {
            let down_next = subscriber.clone();
            let down_error = subscriber.clone();
            let down_complete = subscriber.clone();
            let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
                move |value: T| down_next.on_next(value),
                move |error: RxError| down_error.on_error(error),
                move || down_complete.on_complete(),
            ));
            let sub = subject.subscribe(observer);
            subscriber.add(sub);
            Ok(())
        });
        Self { key, source }
    }

    /// The key this group was created for.
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Clone, T> Clone for GroupedObservable<K, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            source: self.source.clone(),
        }
    }
}

impl<K, T> std::ops::Deref for GroupedObservable<K, T> {
    type Target = Observable<T>;
    fn deref(&self) -> &Observable<T> {
        &self.source
    }
}

struct State<K, T> {
    groups: HashMap<K, PublishSubject<T>>,
}

struct Ctx<K, T> {
    downstream: Subscriber<GroupedObservable<K, T>>,
    state: Mutex<State<K, T>>,
}

fn dispatch<K, T>(ctx: &Arc<Ctx<K, T>>, key: K, value: T)
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    let existing = ctx.state.lock().groups.get(&key).cloned();
    if let Some(subject) = existing {
        subject.next(value);
        return;
    }
    if ctx.downstream.is_unsubscribed() {
        return;
    }
    let subject = PublishSubject::new();
    let race_winner = {
        let mut state = ctx.state.lock();
        match state.groups.get(&key) {
            Some(winner) => Some(winner.clone()),
            None => {
                state.groups.insert(key.clone(), subject.clone());
                None
            }
        }
    };
    if let Some(winner) = race_winner {
        winner.next(value);
        return;
    }
    let grouped = GroupedObservable::new(key, subject.clone());
    ctx.downstream.on_next(grouped);
    subject.next(value);
}

/// Partition `source` by `key_fn`. The outer observable emits one
/// [`GroupedObservable`] per distinct key, the first time that key appears;
/// the multiset of values across all emitted groups equals the multiset of
/// input values, and within a group, order is preserved.
pub fn group_by<T, K, F>(source: &Observable<T>, key_fn: F) -> Observable<GroupedObservable<K, T>>
where
    T: Clone + Send + Sync + 'static,
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
{
    let source = source.clone();
    let key_fn = Arc::new(key_fn);

    Observable::create(move |downstream: Subscriber<GroupedObservable<K, T>>| {
        let ctx = Arc::new(Ctx {
            downstream: downstream.clone(),
            state: Mutex::new(State {
                groups: HashMap::new(),
            }),
        });

        let key_fn = key_fn.clone();
        let next_ctx = ctx.clone();
        let error_ctx = ctx.clone();
        let complete_ctx = ctx.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| {
                let key = key_fn(&value);
                dispatch(&next_ctx, key, value);
            },
            move |error: RxError| {
                let subjects: Vec<PublishSubject<T>> =
                    error_ctx.state.lock().groups.values().cloned().collect();
                for subject in subjects {
                    subject.error(error.clone());
                }
                error_ctx.downstream.on_error(error);
            },
            move || {
                let subjects: Vec<PublishSubject<T>> =
                    complete_ctx.state.lock().groups.values().cloned().collect();
                for subject in subjects {
                    subject.complete();
                }
                complete_ctx.downstream.on_complete();
            },
        ));
        // Deliberately NOT `Subscriber::from_parent(&downstream, ...)`: that would
        // share the outer composite, so the outer unsubscribing would make this
        // subscriber's own `on_next` a no-op and stop feeding *every* already-handed-out
        // group, not just block new ones. Giving it an independent composite means only
        // `dispatch`'s explicit `ctx.downstream.is_unsubscribed()` check (which gates new
        // groups, not existing ones) governs that distinction.
        let upstream_subscriber = Subscriber::new(observer);
        source.subscribe_with(upstream_subscriber);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::from_iter;
    use parking_lot::Mutex as StdMutex;
    use rx_core::Subscription;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn partitions_preserve_per_group_order_and_total_multiset() {
        let source = from_iter(vec![1, 2, 3, 4, 5, 6]);
        let grouped = group_by(&source, |v: &i32| v % 2);

        let captured: Arc<StdMutex<StdHashMap<i32, Vec<i32>>>> =
            Arc::new(StdMutex::new(StdHashMap::new()));
        let groups_seen: Arc<StdMutex<Vec<i32>>> = Arc::new(StdMutex::new(Vec::new()));

        let c = captured.clone();
        let g = groups_seen.clone();
        let outer_observer: Arc<dyn Observer<GroupedObservable<i32, i32>>> =
            Arc::new(FnObserver::new(
                move |group: GroupedObservable<i32, i32>| {
                    g.lock().push(*group.key());
                    let key = *group.key();
                    let c = c.clone();
                    let inner_observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
                        move |v: i32| c.lock().entry(key).or_default().push(v),
                        |_e: RxError| {},
                        || {},
                    ));
                    group.subscribe(inner_observer);
                },
                |_e: RxError| {},
                || {},
            ));
        grouped.subscribe(outer_observer);

        assert_eq!(*groups_seen.lock(), vec![1, 0]);
        let captured = captured.lock();
        assert_eq!(captured.get(&1), Some(&vec![1, 3, 5]));
        assert_eq!(captured.get(&0), Some(&vec![2, 4, 6]));
    }

    #[test]
    fn error_tears_down_all_live_groups() {
        let source: Observable<i32> = crate::factory::error(RxError::stream("boom"));
        let grouped = group_by(&source, |v: &i32| *v);
        let errored = Arc::new(StdMutex::new(false));
        let e = errored.clone();
        let observer: Arc<dyn Observer<GroupedObservable<i32, i32>>> = Arc::new(FnObserver::new(
            |_g: GroupedObservable<i32, i32>| {},
            move |_err: RxError| *e.lock() = true,
            || {},
        ));
        grouped.subscribe(observer);
        assert!(*errored.lock());
    }

    #[test]
    fn existing_groups_keep_receiving_after_the_outer_unsubscribes() {
        // Emits the same key three times in a row, entirely synchronously:
        // the first emission creates the group, and the outer observer below
        // unsubscribes the *outer* subscription from inside that first
        // callback, before the source's second and third emissions run.
        let source = crate::factory::create(|subscriber: Subscriber<i32>| {
            subscriber.on_next(1);
            subscriber.on_next(1);
            subscriber.on_next(1);
            subscriber.on_complete();
            Ok(())
        });
        let grouped = group_by(&source, |v: &i32| *v);

        let captured: Arc<StdMutex<Vec<i32>>> = Arc::new(StdMutex::new(Vec::new()));
        let groups_seen = Arc::new(StdMutex::new(0usize));
        let top: Arc<StdMutex<Option<Arc<dyn rx_core::Subscription>>>> =
            Arc::new(StdMutex::new(None));

        let c = captured.clone();
        let g = groups_seen.clone();
        let t = top.clone();
        let outer_observer: Arc<dyn Observer<GroupedObservable<i32, i32>>> =
            Arc::new(FnObserver::new(
                move |group: GroupedObservable<i32, i32>| {
                    *g.lock() += 1;
                    let c = c.clone();
                    let inner_observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
                        move |v: i32| c.lock().push(v),
                        |_e: RxError| {},
                        || {},
                    ));
                    group.subscribe(inner_observer);
                    if let Some(outer) = t.lock().take() {
                        outer.unsubscribe();
                    }
                },
                |_e: RxError| {},
                || {},
            ));

        let outer_subscriber = Subscriber::new(outer_observer);
        let outer_subscription: Arc<dyn rx_core::Subscription> = outer_subscriber.subscription();
        *top.lock() = Some(outer_subscription);
        grouped.subscribe_with(outer_subscriber);

        assert_eq!(*groups_seen.lock(), 1, "only one group should ever be created");
        assert_eq!(
            *captured.lock(),
            vec![1, 1, 1],
            "the group handed out before the outer unsubscribed must keep receiving",
        );
    }
}
