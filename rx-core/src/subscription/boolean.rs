use super::Subscription;
use std::sync::atomic::{AtomicBool, Ordering};

/// A subscription backed by a single atomic flag.
///
/// `unsubscribe` is idempotent; the flag only ever transitions `false -> true`.
#[derive(Debug, Default)]
pub struct BooleanSubscription {
    unsubscribed: AtomicBool,
}

impl BooleanSubscription {
    /// Create a new, active subscription.
    pub fn new() -> Self {
        Self {
            unsubscribed: AtomicBool::new(false),
        }
    }
}

impl Subscription for BooleanSubscription {
    fn unsubscribe(&self) {
        self.unsubscribed.store(true, Ordering::Release);
    }

    fn is_unsubscribed(&self) -> bool {
        self.unsubscribed.load(Ordering::Acquire)
    }
}
