//! Cross-thread coordination primitives.
//!
//! - A single-assignment result channel: [`channel`] creates a [`ResultSource`] which may
//!   deposit a value or an [`ErrorRecord`] exactly once, and a [`ResultSink`] which retrieves it
//!   exactly once, blocking if necessary.
//! - A deadlock-avoiding multi-lock acquirer: [`acquire_all`] and friends lock a set of
//!   [`Lockable`] resources as a unit, even if different call sites list the same resources in
//!   different orders, and return a [`ScopedMultiLock`] which releases them when dropped.

#[macro_use]
extern crate tracing;

mod cell;
mod lock;
mod record;
mod util;

pub use crate::{
    cell::api::*,
    lock::{
        acquire::{acquire_all, try_acquire_all, try_acquire_all_until, try_lock_all},
        guard::ScopedMultiLock,
        raw::{Acquire, ExclusiveLock, Lockable},
    },
    record::ErrorRecord,
};

/// Error types
pub mod error {
    pub use crate::{
        cell::error::*,
        lock::error::*,
    };
}
