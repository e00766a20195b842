use super::{snapshot, ObserverEntry};
use crate::observer::Observer;
use crate::subscription::{from_action, Subscription};
use crate::RxError;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
enum AsyncTerminal<T> {
    Complete(Option<T>),
    Error(RxError),
}

struct State<T> {
    next_id: u64,
    observers: Vec<ObserverEntry<T>>,
    terminal: Option<AsyncTerminal<T>>,
    latest: Option<T>,
}

/// A hot subject that emits nothing until termination. On `complete`, the
/// single most-recent `next` value (if any) is delivered, followed by
/// completion. On `error`, only the error is delivered — no value, even if
/// one was previously set.
pub struct AsyncSubject<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + Sync + 'static> AsyncSubject<T> {
    /// Create a new, open async subject.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
                latest: None,
            })),
        }
    }

    /// Subscribe `observer`. If the subject has already terminated, the
    /// terminal payload is delivered immediately; otherwise the subscriber
    /// waits silently until termination.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Arc<dyn Subscription> {
        let mut guard = self.state.lock();
        if let Some(terminal) = guard.terminal.clone() {
            drop(guard);
            deliver(&observer, terminal);
            return crate::subscription::unsubscribed();
        }
        let id = guard.next_id;
        guard.next_id += 1;
        guard.observers.push((id, observer));
        drop(guard);

        let state = self.state.clone();
        from_action(move || {
            state.lock().observers.retain(|(i, _)| *i != id);
        })
    }

    /// Record `value` as the latest candidate for delivery at `complete`.
    /// No signal is emitted to subscribers yet.
    pub fn next(&self, value: T) {
        let mut guard = self.state.lock();
        if guard.terminal.is_some() {
            return;
        }
        guard.latest = Some(value);
    }

    /// Terminate with an error: only the error is delivered, the latest
    /// recorded value (if any) is discarded.
    pub fn error(&self, error: RxError) {
        let observers = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            guard.terminal = Some(AsyncTerminal::Error(error.clone()));
            std::mem::take(&mut guard.observers)
        };
        for (_, observer) in observers {
            observer.on_error(error.clone());
        }
    }

    /// Terminate with completion: the latest recorded value (if any) is
    /// delivered via `on_next`, followed by `on_complete`.
    pub fn complete(&self) {
        let (observers, value) = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return (Vec::new(), None);
            }
            let value = guard.latest.clone();
            guard.terminal = Some(AsyncTerminal::Complete(value.clone()));
            (snapshot(&guard.observers), value)
        };
        for observer in &observers {
            if let Some(value) = &value {
                observer.on_next(value.clone());
            }
            observer.on_complete();
        }
    }

    /// Whether this subject has already terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for AsyncSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AsyncSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

fn deliver<T>(observer: &Arc<dyn Observer<T>>, terminal: AsyncTerminal<T>) {
    match terminal {
        AsyncTerminal::Complete(value) => {
            if let Some(value) = value {
                observer.on_next(value);
            }
            observer.on_complete();
        }
        AsyncTerminal::Error(err) => observer.on_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;
    use parking_lot::Mutex as StdMutex;

    fn recording() -> (Arc<dyn Observer<i32>>, Arc<StdMutex<Vec<String>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
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
    fn only_last_value_delivered_on_complete() {
        let subject = AsyncSubject::new();
        let (observer, log) = recording();
        subject.subscribe(observer);
        subject.next(1);
        subject.next(2);
        subject.next(3);
        assert!(log.lock().is_empty());
        subject.complete();
        assert_eq!(*log.lock(), vec!["next(3)", "complete"]);
    }

    #[test]
    fn error_suppresses_pending_value() {
        let subject = AsyncSubject::new();
        let (observer, log) = recording();
        subject.subscribe(observer);
        subject.next(1);
        subject.error(RxError::stream("boom"));
        assert_eq!(*log.lock(), vec!["error"]);
    }
}
