use parking_lot::Mutex;
use rx_core::{FnObserver, Observer, RxError};
use std::fmt;
use std::sync::Arc;

/// One signal captured by a [`TestObserver`]. Errors are stored as their
/// `Display` rendering rather than the original [`RxError`], so a recorded
/// sequence can be compared with `assert_eq!` without `RxError` needing to
/// implement equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded<T> {
    Next(T),
    Error(String),
    Complete,
}

struct Inner<T> {
    log: Mutex<Vec<Recorded<T>>>,
}

/// An [`Observer`] that records every signal it receives, in arrival order.
///
/// `TestObserver::new` returns both the `Arc<dyn Observer<T>>` a subscribe
/// call expects and a handle for inspecting what arrived afterwards;
/// cloning the handle shares the same underlying log.
pub struct TestObserver<T> {
    inner: Arc<Inner<T>>,
}

impl<T> TestObserver<T>
where
    T: Send + Sync + 'static,
{
    /// Build a fresh recorder paired with its `Observer` handle.
    pub fn new() -> (Arc<dyn Observer<T>>, Self) {
        let inner = Arc::new(Inner {
            log: Mutex::new(Vec::new()),
        });
        let handle = Self {
            inner: inner.clone(),
        };

        let next_inner = inner.clone();
        let error_inner = inner.clone();
        let complete_inner = inner.clone();
        let observer: Arc<dyn Observer<T>> = Arc::new(FnObserver::new(
            move |value: T| next_inner.log.lock().push(Recorded::Next(value)),
            move |error: RxError| error_inner.log.lock().push(Recorded::Error(error.to_string())),
            move || complete_inner.log.lock().push(Recorded::Complete),
        ));
        (observer, handle)
    }

    /// A snapshot of every signal recorded so far, in arrival order.
    pub fn recorded(&self) -> Vec<Recorded<T>>
    where
        T: Clone,
    {
        self.inner.log.lock().clone()
    }

    /// The values from every recorded `next`, dropping any terminal signal.
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner
            .log
            .lock()
            .iter()
            .filter_map(|signal| match signal {
                Recorded::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether a terminal signal (`error` or `complete`) has been recorded.
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.inner.log.lock().last(),
            Some(Recorded::Error(_)) | Some(Recorded::Complete)
        )
    }
}

impl<T> Clone for TestObserver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for TestObserver<T>
where
    T: fmt::Debug + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestObserver")
            .field("recorded", &self.recorded())
            .finish()
    }
}
