// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! `Observable`, `lift`, the factory functions, and the representative
//! operator set for reactive-rx.
//!
//! Only a representative sample of the trivial unary-transform catalog
//! lives here ([`operators::unary`]); the rest are external collaborators
//! sharing the same shape. The hard concurrency content lives in
//! [`operators::merge`], [`operators::zip`],
//! [`operators::group_by`], [`operators::observe_on`], [`operators::retry`],
//! [`operators::timeout`], and [`operators::join`].

mod observable;

pub mod factory;
pub mod operators;

pub use observable::Observable;

pub use factory::{create, defer, empty, error, from_iter, interval, just, range};
pub use operators::group_by::{group_by, GroupedObservable};
pub use operators::join::{join2, join3, Plan};
pub use operators::merge::merge;
pub use operators::observe_on::{observe_on, subscribe_on};
pub use operators::retry::retry;
pub use operators::timeout::{timeout, timeout_selector};
pub use operators::unary::{combine_latest, filter, map, take, take_until, try_map};
pub use operators::zip::zip2;
