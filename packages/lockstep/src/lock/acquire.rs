//! Deadlock-avoiding acquisition of lock sets.
//!
//! Call sites are not assumed to agree on any global order of resources, so the protocol never
//! relies on one. Instead, a thread only ever blocks while holding nothing:
//!
//! 1. Block until the first resource is acquired.
//! 2. Try to acquire every other resource without blocking, sweeping from the start of the set.
//! 3. If some resource is contended, release everything, block until that resource is acquired,
//!    and sweep again.
//!
//! Since no thread waits while holding anything, no cycle of waiting threads can form. Under
//! heavy contention threads may repeatedly back off without progress (livelock). This is
//! accepted, as contention windows are expected to be short.

use super::{
    error::*,
    guard::ScopedMultiLock,
    raw::{Acquire, Lockable},
    INLINE_LOCKS,
};
use crate::util::Timeout;
use smallvec::SmallVec;
use std::{
    mem,
    ptr,
    time::{Duration, Instant},
};


// resources acquired so far, in acquisition order.
type Held<'a> = SmallVec<[(usize, &'a dyn Lockable); INLINE_LOCKS]>;

// why the protocol gave up.
enum Failure {
    // the resource at this index is already held by the calling thread.
    Reentrant(usize),
    // the resource at this index could not be acquired within the timeout.
    Blocked(usize),
}

// whether two references point to the same resource.
//
// zero-sized handles may share an address while referring to different resources, so they are
// never considered the same here. if one is listed twice, it reports HeldByCaller itself.
fn same_resource(a: &dyn Lockable, b: &dyn Lockable) -> bool {
    mem::size_of_val(a) != 0 && mem::size_of_val(b) != 0 && ptr::addr_eq(a, b)
}

// index of the first resource that also appears earlier in the set.
fn find_duplicate(resources: &[&dyn Lockable]) -> Option<usize> {
    (1..resources.len())
        .find(|&i| resources[..i].iter().any(|&earlier| same_resource(earlier, resources[i])))
}

// release everything held, most recently acquired first.
fn release_all(held: &mut Held<'_>) {
    while let Some((_, resource)) = held.pop() {
        // safety: held only contains resources this thread acquired and has not yet released,
        //         and popping ensures they are not released twice.
        unsafe { resource.release() };
    }
}

// run the protocol. with Timeout::NonBlocking the protocol makes a single pass and gives up on
// the first contended resource instead of blocking on it.
fn acquire_with<'a>(
    resources: &[&'a dyn Lockable],
    timeout: Timeout,
) -> Result<ScopedMultiLock<'a>, Failure> {
    if let Some(index) = find_duplicate(resources) {
        return Err(Failure::Reentrant(index));
    }

    let mut held = Held::new();
    if resources.is_empty() {
        // safety: holds nothing.
        return Ok(unsafe { ScopedMultiLock::adopt(held) });
    }

    let mut first = 0;
    let mut backoffs: u64 = 0;
    loop {
        // the only point where we may block, and we hold nothing here
        debug_assert!(held.is_empty(), "internal bug");
        let outcome = match &timeout {
            &Timeout::Never => resources[first].acquire(),
            &Timeout::At(deadline) => resources[first].acquire_until(deadline),
            &Timeout::NonBlocking => resources[first].try_acquire(),
        };
        match outcome {
            Acquire::Acquired => held.push((first, resources[first])),
            Acquire::HeldByCaller => return Err(Failure::Reentrant(first)),
            Acquire::Contended => match timeout {
                Timeout::Never => {
                    // blocking acquire gave up anyway, so just block again
                    warn!(index = first, "resource returned Contended from a blocking acquire");
                    continue;
                }
                Timeout::At(_) | Timeout::NonBlocking => return Err(Failure::Blocked(first)),
            },
        }

        // sweep the rest without blocking
        let mut contended = None;
        for (index, &resource) in resources.iter().enumerate() {
            if index == first {
                continue;
            }
            match resource.try_acquire() {
                Acquire::Acquired => held.push((index, resource)),
                Acquire::HeldByCaller => {
                    release_all(&mut held);
                    return Err(Failure::Reentrant(index));
                }
                Acquire::Contended => {
                    contended = Some(index);
                    break;
                }
            }
        }

        let Some(index) = contended else {
            trace!(count = held.len(), backoffs, "acquired lock set");
            // safety: the sweep completed, so held contains every resource, each acquired by
            //         this thread and owned by nothing else.
            return Ok(unsafe { ScopedMultiLock::adopt(held) });
        };

        // back off
        release_all(&mut held);
        if let Timeout::NonBlocking = timeout {
            return Err(Failure::Blocked(index));
        }
        backoffs += 1;
        debug!(index, backoffs, "lock set contended, released all and waiting on contended resource");
        first = index;
    }
}

/// Block until every resource of the lock set is acquired
///
/// Concurrent callers may list overlapping resources in any order without deadlocking. Returns
/// only once all resources are held, as a guard which releases them when dropped.
///
/// Fails if a resource is already held by the calling thread, or appears in the set more than
/// once, in which case nothing is held.
pub fn acquire_all<'a>(
    resources: &[&'a dyn Lockable],
) -> Result<ScopedMultiLock<'a>, ReentrantAcquireError> {
    acquire_with(resources, Timeout::Never)
        .map_err(|failure| match failure {
            Failure::Reentrant(index) => ReentrantAcquireError { index },
            Failure::Blocked(_) => unreachable!("gave up on an unbounded acquisition"),
        })
}

/// Like [`acquire_all`], but give up once `timeout` elapses
///
/// On timeout nothing is held, and the error reports the resource that was being waited on.
pub fn try_acquire_all<'a>(
    resources: &[&'a dyn Lockable],
    timeout: Duration,
) -> Result<ScopedMultiLock<'a>, AcquireError> {
    map_bounded(acquire_with(resources, Timeout::after(timeout)))
}

/// Like [`acquire_all`], but give up once the deadline is reached
pub fn try_acquire_all_until<'a>(
    resources: &[&'a dyn Lockable],
    deadline: Instant,
) -> Result<ScopedMultiLock<'a>, AcquireError> {
    map_bounded(acquire_with(resources, Timeout::At(deadline)))
}

fn map_bounded(
    result: Result<ScopedMultiLock<'_>, Failure>,
) -> Result<ScopedMultiLock<'_>, AcquireError> {
    result.map_err(|failure| match failure {
        Failure::Reentrant(index) => ReentrantAcquireError { index }.into(),
        Failure::Blocked(index) => AcquireTimeoutError { index }.into(),
    })
}

/// Acquire every resource of the lock set if that is possible without blocking
///
/// Makes a single pass. If any resource is held by another thread, releases whatever it
/// acquired and reports the position of that resource.
pub fn try_lock_all<'a>(
    resources: &[&'a dyn Lockable],
) -> Result<ScopedMultiLock<'a>, TryLockError> {
    acquire_with(resources, Timeout::NonBlocking)
        .map_err(|failure| match failure {
            Failure::Reentrant(index) => ReentrantAcquireError { index }.into(),
            Failure::Blocked(index) => ContendedError { index }.into(),
        })
}
