use super::Subscription;
use parking_lot::Mutex;
use std::sync::Arc;

enum State {
    Active(Option<Arc<dyn Subscription>>),
    Unsubscribed,
}

/// A single-slot subscription holder.
///
/// Assigning a new child unsubscribes the previous one. If the container
/// itself is already unsubscribed, the assignee is unsubscribed immediately.
/// Assigning the same instance twice is a no-op.
pub struct SerialSubscription {
    state: Mutex<State>,
}

impl SerialSubscription {
    /// Create a fresh, active, empty serial subscription.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Active(None)),
        }
    }

    /// Replace the held child with `child`, unsubscribing the previous one.
    pub fn set(&self, child: Arc<dyn Subscription>) {
        let mut guard = self.state.lock();
        match &mut *guard {
            State::Active(current) => {
                if let Some(prev) = current {
                    if Arc::ptr_eq(prev, &child) {
                        return;
                    }
                }
                let previous = current.replace(child);
                drop(guard);
                if let Some(previous) = previous {
                    previous.unsubscribe();
                }
            }
            State::Unsubscribed => {
                drop(guard);
                child.unsubscribe();
            }
        }
    }

    /// The currently-held child, if any.
    pub fn get(&self) -> Option<Arc<dyn Subscription>> {
        match &*self.state.lock() {
            State::Active(current) => current.clone(),
            State::Unsubscribed => None,
        }
    }
}

impl Default for SerialSubscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription for SerialSubscription {
    fn unsubscribe(&self) {
        let previous = {
            let mut guard = self.state.lock();
            match std::mem::replace(&mut *guard, State::Unsubscribed) {
                State::Active(current) => current,
                State::Unsubscribed => return,
            }
        };
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    fn is_unsubscribed(&self) -> bool {
        matches!(&*self.state.lock(), State::Unsubscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::BooleanSubscription;

    #[test]
    fn set_unsubscribes_previous() {
        let serial = SerialSubscription::new();
        let a: Arc<dyn Subscription> = Arc::new(BooleanSubscription::new());
        let b: Arc<dyn Subscription> = Arc::new(BooleanSubscription::new());
        serial.set(a.clone());
        serial.set(b.clone());
        assert!(a.is_unsubscribed());
        assert!(!b.is_unsubscribed());
    }

    #[test]
    fn set_same_instance_is_noop() {
        let serial = SerialSubscription::new();
        let a: Arc<dyn Subscription> = Arc::new(BooleanSubscription::new());
        serial.set(a.clone());
        serial.set(a.clone());
        assert!(!a.is_unsubscribed());
    }

    #[test]
    fn set_after_unsubscribe_cancels_immediately() {
        let serial = SerialSubscription::new();
        serial.unsubscribe();
        let a: Arc<dyn Subscription> = Arc::new(BooleanSubscription::new());
        serial.set(a.clone());
        assert!(a.is_unsubscribed());
    }
}
