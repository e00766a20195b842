use super::Subscription;
use parking_lot::Mutex;
use std::sync::Arc;

enum State {
    Active(Vec<Arc<dyn Subscription>>),
    Unsubscribed,
}

/// A set of child subscriptions that are torn down together.
///
/// - `add`: if the composite is already unsubscribed, the child is
///   unsubscribed immediately and never retained; otherwise it is retained.
/// - `remove`: detaches a retained child and unsubscribes it.
/// - `clear`: unsubscribes every retained child and forgets them, but the
///   composite itself remains usable for future `add` calls.
/// - `unsubscribe`: unsubscribes every retained child and latches the
///   composite itself into the unsubscribed state; any later `add` is a
///   no-op beyond immediately unsubscribing the offered child.
///
/// All operations are linearizable with respect to `unsubscribe`: no child
/// can be leaked by a race between `add` and `unsubscribe`.
pub struct CompositeSubscription {
    state: Mutex<State>,
}

impl CompositeSubscription {
    /// Create a fresh, active, empty composite.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Active(Vec::new())),
        }
    }

    /// Add `child`. See type-level docs for the already-unsubscribed case.
    pub fn add(&self, child: Arc<dyn Subscription>) {
        let mut guard = self.state.lock();
        match &mut *guard {
            State::Active(children) => children.push(child),
            State::Unsubscribed => {
                drop(guard);
                child.unsubscribe();
            }
        }
    }

    /// Detach `child` from this composite and unsubscribe it.
    ///
    /// No-op if `child` is not currently retained (e.g. it was already
    /// removed, or the composite never held an equal `Arc`).
    pub fn remove(&self, child: &Arc<dyn Subscription>) {
        let removed = {
            let mut guard = self.state.lock();
            match &mut *guard {
                State::Active(children) => {
                    let before = children.len();
                    children.retain(|c| !Arc::ptr_eq(c, child));
                    before != children.len()
                }
                State::Unsubscribed => false,
            }
        };
        if removed {
            child.unsubscribe();
        }
    }

    /// Unsubscribe every retained child and forget them. The composite
    /// remains active and usable afterward (distinct from `unsubscribe`).
    pub fn clear(&self) {
        let drained = {
            let mut guard = self.state.lock();
            match &mut *guard {
                State::Active(children) => std::mem::take(children),
                State::Unsubscribed => return,
            }
        };
        for child in drained {
            child.unsubscribe();
        }
    }

    /// Number of children currently retained. Intended for tests/diagnostics.
    pub fn len(&self) -> usize {
        match &*self.state.lock() {
            State::Active(children) => children.len(),
            State::Unsubscribed => 0,
        }
    }

    /// Whether no children are currently retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CompositeSubscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription for CompositeSubscription {
    fn unsubscribe(&self) {
        let drained = {
            let mut guard = self.state.lock();
            match std::mem::replace(&mut *guard, State::Unsubscribed) {
                State::Active(children) => children,
                State::Unsubscribed => return,
            }
        };
        for child in drained {
            child.unsubscribe();
        }
    }

    fn is_unsubscribed(&self) -> bool {
        matches!(&*self.state.lock(), State::Unsubscribed)
    }
}
