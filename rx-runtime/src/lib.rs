// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Scheduler/Worker abstraction for reactive-rx.
//!
//! Every time-related operator (`observe_on`, `timeout`, periodic sources)
//! runs through a [`Scheduler`], never a bare `std::thread::sleep` or tokio
//! call directly — that indirection is what makes [`schedulers::TestScheduler`]
//! a drop-in replacement for deterministic tests.

mod registry;
mod scheduler;
pub mod schedulers;

pub use registry::Schedulers;
pub use scheduler::{Action, RepeatableAction, Scheduler, Worker};
