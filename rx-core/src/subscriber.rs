//! Subscriber: an observer carrying a subscription.

use crate::observer::Observer;
use crate::subscription::{CompositeSubscription, Subscription};
use crate::RxError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An observer that additionally owns a [`CompositeSubscription`].
///
/// Once `is_unsubscribed()` becomes true, the subscriber ignores further
/// signals. `on_error`/`on_complete` are terminal: after either, all further
/// signals (including a second terminal one) are silently dropped, and a
/// terminal signal implicitly unsubscribes the subscriber so that
/// cancellation propagates upstream through the shared composite.
pub struct Subscriber<T> {
    observer: Arc<dyn Observer<T>>,
    subscription: Arc<CompositeSubscription>,
    terminated: Arc<AtomicBool>,
}

impl<T> Subscriber<T> {
    /// Wrap `observer` with a fresh composite subscription.
    pub fn new(observer: Arc<dyn Observer<T>>) -> Self {
        Self {
            observer,
            subscription: Arc::new(CompositeSubscription::new()),
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wrap `observer` for a different item type `T`, but share `parent`'s
    /// composite subscription. This is how operator chains collapse
    /// cancellation into a single tree: unsubscribing any subscriber in the
    /// chain tears down every other subscriber sharing the same composite.
    pub fn from_parent<U>(parent: &Subscriber<U>, observer: Arc<dyn Observer<T>>) -> Self {
        Self {
            observer,
            subscription: parent.subscription.clone(),
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The subscription backing this subscriber (also its composite, so
    /// operators can install their own child subscriptions for
    /// cancellation-propagation).
    pub fn subscription(&self) -> Arc<CompositeSubscription> {
        self.subscription.clone()
    }

    /// Install `sub` as a child of this subscriber's composite.
    pub fn add(&self, sub: Arc<dyn Subscription>) {
        self.subscription.add(sub);
    }

    /// Whether this subscriber has been unsubscribed (by cancellation or by
    /// a prior terminal signal).
    pub fn is_unsubscribed(&self) -> bool {
        self.subscription.is_unsubscribed()
    }

    /// Cancel this subscriber and everything sharing its composite.
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }

    /// Deliver `value`. Dropped silently if unsubscribed or already terminated.
    pub fn on_next(&self, value: T) {
        if self.is_unsubscribed() || self.terminated.load(Ordering::Acquire) {
            return;
        }
        self.observer.on_next(value);
    }

    /// Deliver a terminal error. The first terminal signal wins; this also
    /// unsubscribes the subscriber. A second call (error arriving after
    /// completion, or after a previous error) is routed to the process-wide
    /// unhandled-error hook instead of the observer.
    pub fn on_error(&self, error: RxError) {
        if self.is_unsubscribed() {
            return;
        }
        if self.terminated.swap(true, Ordering::AcqRel) {
            crate::error::report_unhandled(&error);
            return;
        }
        self.observer.on_error(error);
        self.subscription.unsubscribe();
    }

    /// Deliver terminal completion. The first terminal signal wins; this
    /// also unsubscribes the subscriber.
    pub fn on_complete(&self) {
        if self.is_unsubscribed() {
            return;
        }
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.observer.on_complete();
        self.subscription.unsubscribe();
    }

    /// Wrap this subscriber's observer in a [`synchronize`] adapter so
    /// concurrent producers (e.g. the inners of a `merge`) cannot interleave
    /// calls into it. The subscription tree is unchanged.
    pub fn synchronized(self) -> Self
    where
        T: 'static,
    {
        Self {
            observer: synchronize(self.observer),
            subscription: self.subscription,
            terminated: self.terminated,
        }
    }
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            observer: self.observer.clone(),
            subscription: self.subscription.clone(),
            terminated: self.terminated.clone(),
        }
    }
}

struct SynchronizedObserver<T> {
    inner: Arc<dyn Observer<T>>,
    lock: Mutex<()>,
}

impl<T> Observer<T> for SynchronizedObserver<T>
where
    T: Send,
{
    fn on_next(&self, value: T) {
        let _guard = self.lock.lock();
        self.inner.on_next(value);
    }

    fn on_error(&self, error: RxError) {
        let _guard = self.lock.lock();
        self.inner.on_error(error);
    }

    fn on_complete(&self) {
        let _guard = self.lock.lock();
        self.inner.on_complete();
    }
}

/// Serialize concurrent calls into `observer` using a monitor, so that a
/// multi-producer source (a `merge` of several inners, for example) can
/// safely share one downstream observer without interleaving partial calls.
pub fn synchronize<T>(observer: Arc<dyn Observer<T>>) -> Arc<dyn Observer<T>>
where
    T: Send + 'static,
{
    Arc::new(SynchronizedObserver {
        inner: observer,
        lock: Mutex::new(()),
    })
}
