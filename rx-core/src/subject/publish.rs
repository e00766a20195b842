use super::{snapshot, ObserverEntry, Terminal};
use crate::observer::Observer;
use crate::subscription::{from_action, Subscription};
use crate::RxError;
use parking_lot::Mutex;
use std::sync::Arc;

struct State<T> {
    next_id: u64,
    observers: Vec<ObserverEntry<T>>,
    terminal: Option<Terminal>,
}

/// A hot subject that replays nothing to late subscribers: only signals
/// emitted after `subscribe` are seen, except that a terminal signal is
/// still replayed to subscribers that arrive after termination.
pub struct PublishSubject<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + Sync + 'static> PublishSubject<T> {
    /// Create a new, open subject with no subscribers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
            })),
        }
    }

    /// Subscribe `observer`. Returns a subscription that detaches it.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Arc<dyn Subscription> {
        let mut guard = self.state.lock();
        if let Some(terminal) = guard.terminal.clone() {
            drop(guard);
            deliver_terminal(&observer, terminal);
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

    /// Emit a value to all currently-subscribed observers. No-op if the
    /// subject has already terminated.
    pub fn next(&self, value: T) {
        let observers = {
            let guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            snapshot(&guard.observers)
        };
        for observer in observers {
            observer.on_next(value.clone());
        }
    }

    /// Terminate the subject with an error, delivered to all current
    /// subscribers. Idempotent: a second terminal call is a no-op.
    pub fn error(&self, error: RxError) {
        let observers = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            guard.terminal = Some(Terminal::Error(error.clone()));
            std::mem::take(&mut guard.observers)
        };
        for (_, observer) in observers {
            observer.on_error(error.clone());
        }
    }

    /// Terminate the subject with completion, delivered to all current
    /// subscribers. Idempotent: a second terminal call is a no-op.
    pub fn complete(&self) {
        let observers = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            guard.terminal = Some(Terminal::Complete);
            std::mem::take(&mut guard.observers)
        };
        for (_, observer) in observers {
            observer.on_complete();
        }
    }

    /// Whether this subject has already terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// Number of currently-active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().observers.len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PublishSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

pub(super) fn deliver_terminal<T>(observer: &Arc<dyn Observer<T>>, terminal: Terminal) {
    match terminal {
        Terminal::Error(err) => observer.on_error(err),
        Terminal::Complete => observer.on_complete(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (Arc<dyn Observer<i32>>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let next_count = Arc::new(AtomicUsize::new(0));
        let complete_count = Arc::new(AtomicUsize::new(0));
        let (n, c) = (next_count.clone(), complete_count.clone());
        let observer: Arc<dyn Observer<i32>> = Arc::new(FnObserver::new(
            move |_v: i32| {
                n.fetch_add(1, Ordering::SeqCst);
            },
            move |_e: RxError| {},
            move || {
                c.fetch_add(1, Ordering::SeqCst);
            },
        ));
        (observer, next_count, complete_count)
    }

    #[test]
    fn late_subscriber_misses_prior_values() {
        let subject = PublishSubject::new();
        subject.next(1);
        let (observer, next_count, _) = counting();
        subject.subscribe(observer);
        subject.next(2);
        assert_eq!(next_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn terminal_is_replayed_to_late_subscribers() {
        let subject = PublishSubject::new();
        subject.complete();
        let (observer, _, complete_count) = counting();
        subject.subscribe(observer);
        assert_eq!(complete_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_detaches_observer() {
        let subject = PublishSubject::new();
        let (observer, next_count, _) = counting();
        let sub = subject.subscribe(observer);
        sub.unsubscribe();
        subject.next(1);
        assert_eq!(next_count.load(Ordering::SeqCst), 0);
    }
}
