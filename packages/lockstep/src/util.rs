//! Blocking utilities shared by the channel and the lock acquirer.

use std::time::{Duration, Instant};


/// Timeout for a blocking operation.
pub(crate) enum Timeout {
    /// Never time out.
    Never,
    /// Time out at the given deadline.
    At(Instant),
    /// Time out if the operation cannot complete without blocking.
    NonBlocking,
}

impl Timeout {
    /// Time out once `timeout` has elapsed from now, saturating to never on overflow.
    pub(crate) fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Timeout::At(deadline),
            None => Timeout::Never,
        }
    }
}
