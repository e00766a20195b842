//! Cancellation primitives.
//!
//! A [`Subscription`] is a cancellation token. `unsubscribe` is idempotent,
//! monotonic, thread-safe, and observable synchronously from any thread.

mod action;
mod boolean;
mod composite;
mod serial;

pub use action::ActionSubscription;
pub use boolean::BooleanSubscription;
pub use composite::CompositeSubscription;
pub use serial::SerialSubscription;

use std::sync::Arc;

/// A cancellable handle shared by producers, operators, and subscribers.
///
/// Implementations must make `unsubscribe` idempotent and safe to call
/// concurrently with itself and with `is_unsubscribed`, including from
/// within a signal callback on a different thread.
pub trait Subscription: Send + Sync {
    /// Cancel this subscription. Calling this more than once has no
    /// additional effect.
    fn unsubscribe(&self);

    /// Whether this subscription has already been unsubscribed. Once this
    /// returns `true` it never returns `false` again.
    fn is_unsubscribed(&self) -> bool;
}

/// An already-unsubscribed, no-op subscription.
pub fn unsubscribed() -> Arc<dyn Subscription> {
    let sub = BooleanSubscription::new();
    sub.unsubscribe();
    Arc::new(sub)
}

/// A fresh, active boolean subscription.
pub fn empty() -> Arc<dyn Subscription> {
    Arc::new(BooleanSubscription::new())
}

/// A subscription that runs `action` exactly once, on first `unsubscribe`.
pub fn from_action<F>(action: F) -> Arc<dyn Subscription>
where
    F: FnOnce() + Send + 'static,
{
    Arc::new(ActionSubscription::new(action))
}

/// A fresh, empty composite subscription.
pub fn composite() -> Arc<CompositeSubscription> {
    Arc::new(CompositeSubscription::new())
}

/// A fresh, empty serial subscription.
pub fn serial() -> Arc<SerialSubscription> {
    Arc::new(SerialSubscription::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_starts_active() {
        let s = empty();
        assert!(!s.is_unsubscribed());
        s.unsubscribe();
        assert!(s.is_unsubscribed());
    }

    #[test]
    fn unsubscribed_is_already_cancelled() {
        assert!(unsubscribed().is_unsubscribed());
    }

    #[test]
    fn from_action_runs_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = from_action(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
