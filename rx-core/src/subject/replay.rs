use super::publish::deliver_terminal;
use super::{snapshot, ObserverEntry, Terminal};
use crate::observer::Observer;
use crate::subscription::{from_action, Subscription};
use crate::RxError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

enum Bound {
    Unbounded,
    Count(usize),
    Window(Duration),
}

struct State<T> {
    next_id: u64,
    observers: Vec<ObserverEntry<T>>,
    terminal: Option<Terminal>,
    buffer: VecDeque<(Instant, T)>,
    bound: Bound,
}

impl<T> State<T> {
    fn evict(&mut self) {
        match self.bound {
            Bound::Unbounded => {}
            Bound::Count(capacity) => {
                while self.buffer.len() > capacity {
                    self.buffer.pop_front();
                }
            }
            Bound::Window(window) => {
                let now = Instant::now();
                while matches!(self.buffer.front(), Some((t, _)) if now.duration_since(*t) > window)
                {
                    self.buffer.pop_front();
                }
            }
        }
    }
}

/// A hot subject that replays every buffered historical value to new
/// subscribers (eviction in insertion order, bounded by count or by a
/// sliding time window), then subsequent values and the terminal signal.
pub struct ReplaySubject<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone + Send + Sync + 'static> ReplaySubject<T> {
    fn with_bound(bound: Bound) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                observers: Vec::new(),
                terminal: None,
                buffer: VecDeque::new(),
                bound,
            })),
        }
    }

    /// An unbounded replay subject: every value ever emitted is replayed to
    /// new subscribers.
    pub fn new() -> Self {
        Self::with_bound(Bound::Unbounded)
    }

    /// A replay subject bounded to the last `capacity` values.
    ///
    /// # Panics
    /// Panics if `capacity` is zero: a zero-capacity replay buffer would
    /// evict every value before any subscriber could see it, so this fails
    /// fast at construction rather than silently replaying nothing.
    pub fn bounded(capacity: usize) -> Self {
        assert_ne!(
            capacity, 0,
            "ReplaySubject::bounded: capacity must be greater than zero"
        );
        Self::with_bound(Bound::Count(capacity))
    }

    /// A replay subject bounded to values emitted within `window` of now.
    ///
    /// # Panics
    /// Panics if `window` is zero, for the same reason `bounded(0)` panics.
    pub fn windowed(window: Duration) -> Self {
        assert!(
            !window.is_zero(),
            "ReplaySubject::windowed: window must be greater than zero"
        );
        Self::with_bound(Bound::Window(window))
    }

    /// Subscribe `observer`; it immediately receives the buffered replay
    /// (oldest first), then any terminal signal, then subsequent signals.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) -> Arc<dyn Subscription> {
        let mut guard = self.state.lock();
        guard.evict();
        for (_, value) in &guard.buffer {
            observer.on_next(value.clone());
        }
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

    /// Emit a value: buffers it (subject to eviction) and fans out to
    /// current subscribers.
    pub fn next(&self, value: T) {
        let observers = {
            let mut guard = self.state.lock();
            if guard.terminal.is_some() {
                return;
            }
            guard.buffer.push_back((Instant::now(), value.clone()));
            guard.evict();
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

    /// Whether this subject has already terminated.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ReplaySubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ReplaySubject<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;
    use parking_lot::Mutex as StdMutex;

    fn recording() -> (Arc<dyn Observer<i32>>, Arc<StdMutex<Vec<i32>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let l = log.clone();
        let observer: Arc<dyn Observer<i32>> =
            Arc::new(FnObserver::new(move |v: i32| l.lock().push(v), |_| {}, || {}));
        (observer, log)
    }

    #[test]
    fn unbounded_replays_all_history() {
        let subject = ReplaySubject::new();
        subject.next(1);
        subject.next(2);
        subject.next(3);
        let (observer, log) = recording();
        subject.subscribe(observer);
        assert_eq!(*log.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn bounded_evicts_oldest_first() {
        let subject = ReplaySubject::bounded(2);
        subject.next(1);
        subject.next(2);
        subject.next(3);
        let (observer, log) = recording();
        subject.subscribe(observer);
        assert_eq!(*log.lock(), vec![2, 3]);
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn bounded_zero_capacity_fails_fast_at_construction() {
        let _subject: ReplaySubject<i32> = ReplaySubject::bounded(0);
    }

    #[test]
    #[should_panic(expected = "window must be greater than zero")]
    fn windowed_zero_window_fails_fast_at_construction() {
        let _subject: ReplaySubject<i32> = ReplaySubject::windowed(Duration::ZERO);
    }
}
