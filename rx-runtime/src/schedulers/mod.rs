//! Concrete [`crate::Scheduler`] implementations.

mod immediate;
mod new_thread;
mod pool;
mod test_scheduler;
mod thread_executor;
mod trampoline;

pub use immediate::ImmediateScheduler;
pub use new_thread::NewThreadScheduler;
pub use pool::PoolScheduler;
pub use test_scheduler::TestScheduler;
pub use trampoline::TrampolineScheduler;

#[cfg(feature = "runtime-tokio")]
mod tokio_scheduler;
#[cfg(feature = "runtime-tokio")]
pub use tokio_scheduler::TokioScheduler;

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
