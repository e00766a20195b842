// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core traits and types for the reactive-rx streaming library.
//!
//! This crate provides the contract every producer, operator, and consumer
//! in the workspace is built on:
//!
//! - [`subscription`]: cancellable handles ([`Subscription`], boolean/action/
//!   composite/serial variants).
//! - [`Observer`]/[`Subscriber`]: the three-signal consumer interface and
//!   its subscription-carrying wrapper.
//! - [`subject`]: hot multicast sinks (`Publish`/`Behavior`/`Replay`/`Async`).
//! - [`error`]: the [`RxError`] taxonomy and the process-wide unhandled-error hook.

#[macro_use]
mod logging;

mod error;
mod observer;
mod subscriber;
pub mod subscription;

pub mod subject;

pub use error::{
    clear_unhandled_error_hook, report_unhandled, set_unhandled_error_hook, Result, ResultExt,
    RxError, UserError,
};
pub use observer::{FnObserver, Observer};
pub use subscriber::{synchronize, Subscriber};
pub use subscription::Subscription;
