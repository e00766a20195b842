//! Hot multicast subjects.
//!
//! A subject is simultaneously an [`Observer`](crate::Observer) accepting
//! signals and a producer that fans them out to every subscriber active at
//! emission time. All four variants share the same at-most-once-terminal
//! invariant and the same concurrency discipline: a snapshot of subscribers
//! is taken under the lock and dispatched outside it, so a signal-in-flight
//! never observes a torn subscriber list and an observer that
//! subscribes/unsubscribes from within its own callback cannot deadlock.

mod async_subject;
mod behavior;
mod publish;
mod replay;
mod subject_error;

pub use async_subject::AsyncSubject;
pub use behavior::BehaviorSubject;
pub use publish::PublishSubject;
pub use replay::ReplaySubject;
pub use subject_error::SubjectError;

use crate::observer::Observer;
use std::sync::Arc;

pub(crate) type ObserverEntry<T> = (u64, Arc<dyn Observer<T>>);

pub(crate) fn snapshot<T>(entries: &[ObserverEntry<T>]) -> Vec<Arc<dyn Observer<T>>> {
    entries.iter().map(|(_, o)| o.clone()).collect()
}

#[derive(Clone)]
pub(crate) enum Terminal {
    Error(crate::RxError),
    Complete,
}
