use super::Subscription;
use parking_lot::Mutex;

/// A subscription that runs a one-shot action the first time it is unsubscribed.
pub struct ActionSubscription {
    action: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ActionSubscription {
    /// Wrap `action` so it runs exactly once, on first `unsubscribe`.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }
}

impl Subscription for ActionSubscription {
    fn unsubscribe(&self) {
        if let Some(action) = self.action.lock().take() {
            action();
        }
    }

    fn is_unsubscribed(&self) -> bool {
        self.action.lock().is_none()
    }
}
