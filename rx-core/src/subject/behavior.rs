use super::publish::deliver_terminal;
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
    latest: T,
}

/// A hot subject that replays its most recent value (or the initial default
/// if none has been emitted yet) to every new subscriber, then subsequent
/// signals. If already terminated, only the terminal signal is delivered.
pub struct BehaviorSubject<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + Sync + 'static> BehaviorSubject<T> {
    /// Create a new subject seeded with `default`.
    pub fn new(default: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
                latest: default,
            })),
        }
    }

    /// Subscribe `observer`; it immediately receives the current value (or
    /// the terminal signal if the subject has already terminated), then
    /// subsequent signals.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Arc<dyn Subscription> {
        let mut guard = self.state.lock();
        if let Some(terminal) = guard.terminal.clone() {
            drop(guard);
            deliver_terminal(&observer, terminal);
            return crate::subscription::unsubscribed();
        }
        observer.on_next(guard.latest.clone());
        let id = guard.next_id;
        guard.next_id += 1;
        guard.observers.push((id, observer));
        drop(guard);

        let state = self.state.clone();
        from_action(move || {
            state.lock().observers.retain(|(i, _)| *i != id);
        })
    }

    /// Emit a value: updates the latest-value cell and fans out to current subscribers.
    pub fn next(&self, value: T) {
        let observers = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            guard.latest = value.clone();
            snapshot(&guard.observers)
        };
        for observer in observers {
            observer.on_next(value.clone());
        }
    }

    /// Terminate with an error.
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

    /// Terminate with completion.
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

    /// The current latest value (whether or not anyone has subscribed).
    pub fn value(&self) -> T {
        self.state.lock().latest.clone()
    }

    /// Whether this subject has already terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }
}

impl<T> Clone for BehaviorSubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}
