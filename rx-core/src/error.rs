//! Error types for the reactive-rx core.
//!
//! This module defines the root [`RxError`] taxonomy used by every producer,
//! operator, and subject in the workspace, plus a process-wide hook for
//! errors that arrive after a stream has already terminated (the
//! "unhandled error" surface).

use parking_lot::RwLock;
use std::sync::Arc;

/// Root error type for all reactive-rx operations.
#[derive(Debug, thiserror::Error)]
pub enum RxError {
    /// General stream-processing failure that doesn't fit a more specific variant.
    #[error("stream error: {context}")]
    Stream {
        /// Description of what went wrong.
        context: String,
    },

    /// User-originated error wrapped for propagation through `on_error`.
    #[error("user error: {0}")]
    User(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A time-based operator (`timeout`, `timeout_selector`) exceeded its window.
    #[error("timeout error: {context}")]
    Timeout {
        /// Context about the timeout (e.g. the configured duration).
        context: String,
    },

    /// Several errors were aggregated, e.g. from a `merge` with several failing inners.
    #[error("multiple errors occurred: {count} errors")]
    Multiple {
        /// Number of errors aggregated.
        count: usize,
        /// The individual errors (bounded to avoid unbounded growth).
        errors: Vec<RxError>,
    },

    /// Construction-time misuse: negative counts, zero windows, etc.
    #[error("invalid argument: {context}")]
    InvalidArgument {
        /// Description of the violated precondition.
        context: String,
    },
}

impl RxError {
    /// Build a stream-processing error with the given context.
    pub fn stream(context: impl Into<String>) -> Self {
        Self::Stream {
            context: context.into(),
        }
    }

    /// Build a timeout error with the given context.
    pub fn timeout(context: impl Into<String>) -> Self {
        Self::Timeout {
            context: context.into(),
        }
    }

    /// Build an invalid-argument error with the given context.
    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Self::InvalidArgument {
            context: context.into(),
        }
    }

    /// Wrap a user error.
    pub fn user(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::User(Box::new(error))
    }

    /// Aggregate several errors (e.g. from concurrent `merge` inners) into one.
    pub fn aggregate(errors: Vec<RxError>) -> Self {
        Self::Multiple {
            count: errors.len(),
            errors,
        }
    }
}

impl Clone for RxError {
    fn clone(&self) -> Self {
        match self {
            Self::Stream { context } => Self::Stream {
                context: context.clone(),
            },
            // Boxed errors aren't Clone; fold into a Stream error preserving the message.
            Self::User(e) => Self::Stream {
                context: format!("user error: {e}"),
            },
            Self::Timeout { context } => Self::Timeout {
                context: context.clone(),
            },
            Self::Multiple { count, errors } => Self::Multiple {
                count: *count,
                errors: errors.clone(),
            },
            Self::InvalidArgument { context } => Self::InvalidArgument {
                context: context.clone(),
            },
        }
    }
}

/// Specialized `Result` for reactive-rx operations.
pub type Result<T> = std::result::Result<T, RxError>;

/// Extension trait for attaching context to a `Result`'s error.
pub trait ResultExt<T> {
    /// Add static context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Add lazily-computed context to an error.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RxError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| prepend_context(e.into(), context.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| prepend_context(e.into(), f()))
    }
}

fn prepend_context(err: RxError, context: String) -> RxError {
    match err {
        RxError::Stream { context: inner } => RxError::Stream {
            context: format!("{context}: {inner}"),
        },
        other => other,
    }
}

/// Converts an arbitrary external error into [`RxError::User`] via `From`/`?`.
///
/// This indirection exists because a blanket `impl<E: Error + Send + Sync +
/// 'static> From<E> for RxError` would apply at `E = RxError` itself (it
/// derives `thiserror::Error` and is `Send + Sync + 'static`), colliding
/// with std's reflexive `impl<T> From<T> for T` (E0119). Wrapping in
/// `UserError` first keeps the conversion narrow: `UserError` does not
/// itself implement `std::error::Error`, so the blanket impl below cannot
/// apply to it.
pub struct UserError(Box<dyn std::error::Error + Send + Sync>);

impl<E> From<E> for UserError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        UserError(Box::new(e))
    }
}

impl From<UserError> for RxError {
    fn from(e: UserError) -> Self {
        RxError::User(e.0)
    }
}

type UnhandledHook = Arc<dyn Fn(&RxError) + Send + Sync>;

static UNHANDLED_HOOK: RwLock<Option<UnhandledHook>> = RwLock::new(None);

/// Install a process-wide hook invoked for errors that arrive after a stream
/// has already terminated.
///
/// Replaces any previously-installed hook.
pub fn set_unhandled_error_hook<F>(hook: F)
where
    F: Fn(&RxError) + Send + Sync + 'static,
{
    *UNHANDLED_HOOK.write() = Some(Arc::new(hook));
}

/// Remove any installed unhandled-error hook, restoring the default
/// (log via [`crate::warn!`]) behavior.
pub fn clear_unhandled_error_hook() {
    *UNHANDLED_HOOK.write() = None;
}

/// Route an error that could not be delivered to any observer to the
/// process-wide hook, or log it if none is installed.
pub fn report_unhandled(err: &RxError) {
    let hook = UNHANDLED_HOOK.read().clone();
    match hook {
        Some(hook) => hook(err),
        None => crate::warn!("unhandled error after stream termination: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn aggregate_counts_errors() {
        let err = RxError::aggregate(vec![RxError::stream("a"), RxError::stream("b")]);
        match err {
            RxError::Multiple { count, errors } => {
                assert_eq!(count, 2);
                assert_eq!(errors.len(), 2);
            }
            _ => panic!("expected Multiple"),
        }
    }

    #[test]
    fn external_error_converts_through_user_error() {
        #[derive(Debug)]
        struct ParseFailed;
        impl std::fmt::Display for ParseFailed {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "parse failed")
            }
        }
        impl std::error::Error for ParseFailed {}

        let wrapped: UserError = ParseFailed.into();
        let err: RxError = wrapped.into();
        match err {
            RxError::User(inner) => assert_eq!(inner.to_string(), "parse failed"),
            _ => panic!("expected User"),
        }
    }

    #[test]
    fn context_wraps_stream_errors() {
        let result: Result<()> = Err(RxError::stream("boom")).context("while parsing");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("while parsing"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn unhandled_hook_receives_errors() {
        static SEEN: AtomicUsize = AtomicUsize::new(0);
        set_unhandled_error_hook(|_err| {
            SEEN.fetch_add(1, Ordering::SeqCst);
        });
        report_unhandled(&RxError::stream("late"));
        assert_eq!(SEEN.load(Ordering::SeqCst), 1);
        clear_unhandled_error_hook();
    }
}
