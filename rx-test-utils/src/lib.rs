// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities shared across the reactive-rx workspace: a recording
//! [`Observer`](rx_core::Observer) and a re-export of the virtual-time
//! scheduler, so a test can assert on exactly what a subscription saw
//! without hand-rolling a `Vec<String>` logger in every file.

mod recorder;

pub use recorder::{Recorded, TestObserver};
pub use rx_runtime::schedulers::TestScheduler;
pub use rx_runtime::Schedulers;
