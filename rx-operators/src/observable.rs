use rx_core::{Observer, Result, Subscriber};
use rx_core::Subscription;
use std::sync::Arc;

type OnSubscribe<T> = dyn Fn(Subscriber<T>) -> Result<()> + Send + Sync;

/// A lazy, value-typed description of a producer.
///
/// Cold by default: every `subscribe` call invokes `on_subscribe` afresh.
/// Hot behavior is obtained by wrapping a [`rx_core::subject`] instead.
pub struct Observable<T> {
    on_subscribe: Arc<OnSubscribe<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            on_subscribe: self.on_subscribe.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    /// Build an observable from a raw subscribe function. Returning `Err`
    /// is equivalent to a producer throwing synchronously: it is converted
    /// to `on_error` on the subscriber.
    pub fn create<F>(on_subscribe: F) -> Self
    where
        F: Fn(Subscriber<T>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            on_subscribe: Arc::new(on_subscribe),
        }
    }

    /// Subscribe a plain observer. Wraps it in a fresh [`Subscriber`] (its
    /// own composite subscription) and returns that composite.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Arc<dyn Subscription> {
        self.subscribe_with(Subscriber::new(observer))
    }

    /// Subscribe using an already-constructed subscriber, e.g. one sharing a
    /// parent's composite (see [`rx_core::Subscriber::from_parent`]). Used
    /// internally by combinators that attach several sources to one
    /// downstream cancellation tree.
    pub fn subscribe_with(&self, subscriber: Subscriber<T>) -> Arc<dyn Subscription> {
        let subscription: Arc<dyn Subscription> = subscriber.subscription();
        if subscriber.is_unsubscribed() {
            return subscription;
        }
        if let Err(error) = (self.on_subscribe)(subscriber.clone()) {
            subscriber.on_error(error);
        }
        subscription
    }

    /// Transform this observable by installing `operator` between it and
    /// whatever eventually subscribes. `operator` receives the downstream
    /// subscriber and must return the subscriber to hand to this
    /// observable's own `on_subscribe` — typically a [`Subscriber::from_parent`]
    /// wrapping an adapter [`Observer`] that relays into the downstream one.
    pub fn lift<U, Op>(&self, operator: Op) -> Observable<U>
    where
        U: Send + Sync + 'static,
        Op: Fn(Subscriber<U>) -> Subscriber<T> + Send + Sync + 'static,
    {
        let upstream = self.on_subscribe.clone();
        Observable::create(move |downstream: Subscriber<U>| {
            let upstream_subscriber = operator(downstream);
            (upstream)(upstream_subscriber)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rx_core::{FnObserver, RxError};
    use parking_lot::Mutex;

    fn recording() -> (Arc<dyn Observer<i32>>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        let l3 = log.clone();
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |v: i32| l1.lock().push(format!("next({v})")),
            move |_e: RxError| l2.lock().push("error".to_string()),
            move || l3.lock().push("complete".to_string()),
        ));
        (observer, log)
    }

    #[test]
    fn subscribe_runs_producer_and_returns_its_composite() {
        let source = Observable::create(|subscriber: Subscriber<i32>| {
            subscriber.on_next(1);
            subscriber.on_complete();
            Ok(())
        });
        let (observer, log) = recording();
        source.subscribe(observer);
        assert_eq!(*log.lock(), vec!["next(1)", "complete"]);
    }

    #[test]
    fn synchronous_error_from_on_subscribe_reaches_observer() {
        let source: Observable<i32> =
            Observable::create(|_subscriber| Err(RxError::stream("boom")));
        let (observer, log) = recording();
        source.subscribe(observer);
        assert_eq!(*log.lock(), vec!["error"]);
    }

    #[test]
    fn already_unsubscribed_subscriber_never_invokes_producer() {
        let invoked = Arc::new(Mutex::new(false));
        let i = invoked.clone();
        let source = Observable::create(move |_subscriber: Subscriber<i32>| {
            *i.lock() = true;
            Ok(())
        });
        let (observer, _log) = recording();
        let subscriber = Subscriber::new(observer);
        subscriber.unsubscribe();
        source.subscribe_with(subscriber);
        assert!(!*invoked.lock());
    }
}
