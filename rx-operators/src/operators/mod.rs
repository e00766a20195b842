//! The representative operator set: `merge`, `zip`, `group_by`,
//! `observe_on`, `retry`, `timeout`/`timeout_selector`, `join`, plus a
//! handful of trivial unary transforms standing in for the wide catalog of
//! operators not otherwise singled out for their own module.

pub mod group_by;
pub mod join;
pub mod merge;
pub mod observe_on;
pub mod retry;
pub mod timeout;
pub mod unary;
pub mod zip;
