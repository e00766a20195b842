// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # rx
//!
//! A reactive-streams core library with push-based `Observable`s, hot
//! multicast `Subject`s, and a `Scheduler` abstraction that makes
//! time-dependent operators deterministically testable.
//!
//! ## Overview
//!
//! `rx` builds every producer on one shape: a value is pushed downstream by
//! calling `on_next` zero or more times, then terminated by exactly one of
//! `on_error`/`on_complete`. `Subscription` is the cancellation side of that
//! contract, threaded through every operator so cancelling a subscriber
//! tears down whatever it is currently attached to, cold or hot, upstream or
//! down.
//!
//! - [`Observable`]: a lazy, cold producer description. `subscribe` invokes
//!   it afresh every time.
//! - [`Observer`]/[`Subscriber`]: the consumer side — a subscriber is an
//!   observer paired with the [`Subscription`] operators attach their own
//!   cleanup to.
//! - [`subject`]: hot, multicast sinks (`Publish`/`Behavior`/`Replay`/`Async`)
//!   for sharing one upstream across many subscribers.
//! - [`Scheduler`]/[`Worker`]: where work actually runs. [`Schedulers`]
//!   exposes the named, process-wide instances (`immediate`, `trampoline`,
//!   `new_thread`, `computation`, `io`); [`schedulers::TestScheduler`] is a
//!   virtual-time scheduler for deterministic operator tests.
//!
//! ## Quick start
//!
//! ```
//! use rx::prelude::*;
//!
//! let doubled = map(&from_iter(1..=3), |n: i32| n * 2);
//! doubled.subscribe(std::sync::Arc::new(FnObserver::new(
//!     |n: i32| println!("{n}"),
//!     |err| eprintln!("{err}"),
//!     || println!("done"),
//! )));
//! ```

pub use rx_core::subject::{self, AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject, SubjectError};
pub use rx_core::subscription::{self, Subscription};
pub use rx_core::{
    clear_unhandled_error_hook, report_unhandled, set_unhandled_error_hook, FnObserver, Observer,
    Result, ResultExt, RxError, Subscriber, UserError,
};

pub use rx_runtime::{schedulers, Action, RepeatableAction, Scheduler, Schedulers, Worker};

pub use rx_operators::{
    combine_latest, create, defer, empty, error, filter, from_iter, group_by, interval, join2,
    join3, just, map, merge, observe_on, range, retry, subscribe_on, take, take_until, timeout,
    timeout_selector, try_map, zip2, GroupedObservable, Observable, Plan,
};

/// Everything a typical caller needs in scope: the `Observable` type, the
/// operator set, and the `Observer`/`Subscriber`/`Scheduler` traits.
pub mod prelude {
    pub use crate::{
        combine_latest, create, defer, empty, error, filter, from_iter, group_by, interval,
        join2, join3, just, map, merge, observe_on, range, retry, subscribe_on, take, take_until,
        timeout, timeout_selector, try_map, zip2, AsyncSubject, BehaviorSubject, FnObserver,
        GroupedObservable, Observable, Observer, Plan, PublishSubject, ReplaySubject, RxError,
        Scheduler, Schedulers, Subscriber, Subscription, Worker,
    };
}
