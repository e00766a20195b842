// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use rx_core::RxError;
use rx_operators::{filter, from_iter, group_by, map, merge, observe_on, retry, timeout, zip2};
use rx_test_utils::{Recorded, Schedulers, TestObserver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn map_then_filter_then_zip_composes_end_to_end() {
    let doubled = map(&from_iter(0..10), |n: i32| n * 2);
    let multiples_of_four = filter(&doubled, |n: &i32| n % 4 == 0);
    let letters = from_iter(['a', 'b', 'c']);
    let zipped = zip2(&multiples_of_four, &letters, |n: i32, c: char| format!("{n}{c}"));

    let (observer, test) = TestObserver::<String>::new();
    zipped.subscribe(observer);
    assert_eq!(test.values(), vec!["0a", "4b", "8c"]);
    assert!(test.is_terminated());
}

#[test]
fn group_by_then_merge_recovers_the_original_multiset() {
    let source = from_iter(1..=9);
    let grouped = group_by(&source, |n: &i32| n % 3);
    let groups_as_observables = map(&grouped, |g| (*g).clone());
    let regrouped = merge(&groups_as_observables, None);

    let (observer, test) = TestObserver::<i32>::new();
    regrouped.subscribe(observer);

    let mut values = test.values();
    values.sort_unstable();
    assert_eq!(values, (1..=9).collect::<Vec<_>>());
}

#[test]
fn observe_on_then_timeout_still_completes_well_within_the_window() {
    let source = from_iter(0..20);
    let moved = observe_on(&source, Schedulers::trampoline());
    let test_scheduler: Arc<dyn rx_runtime::Scheduler> = Arc::new(Schedulers::test());
    let guarded = timeout(&moved, Duration::from_secs(30), test_scheduler, None);

    let (observer, test) = TestObserver::<i32>::new();
    guarded.subscribe(observer);
    assert_eq!(test.values(), (0..20).collect::<Vec<_>>());
    assert!(test.is_terminated());
}

#[test]
fn retry_recovers_a_source_that_fails_twice_then_succeeds() {
    let attempt = Arc::new(AtomicUsize::new(0));
    let flaky = rx_operators::create(move |subscriber: rx_core::Subscriber<i32>| {
        let n = attempt.fetch_add(1, Ordering::SeqCst);
        if n < 2 {
            subscriber.on_error(RxError::stream("transient"));
        } else {
            subscriber.on_next(99);
            subscriber.on_complete();
        }
        Ok(())
    });
    let retried = retry(&flaky, 5);

    let (observer, test) = TestObserver::<i32>::new();
    retried.subscribe(observer);
    assert_eq!(test.recorded(), vec![Recorded::Next(99), Recorded::Complete]);
}
