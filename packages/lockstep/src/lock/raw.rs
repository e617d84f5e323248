//! Lockable resources.

use std::{
    fmt::{self, Debug, Formatter},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, ThreadId},
    time::Instant,
};


/// Outcome of an attempt to acquire a single [`Lockable`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Acquire {
    /// The calling thread now holds the resource
    Acquired,
    /// Another thread holds the resource
    Contended,
    /// The calling thread already holds the resource, and acquiring it again is refused
    HeldByCaller,
}

/// An exclusive resource which can take part in a lock set
///
/// At most one thread may hold the resource at a time. Implementations that cannot tell which
/// thread holds them never return [`Acquire::HeldByCaller`], in which case reacquiring from the
/// holding thread simply blocks (or times out, or reports contention).
pub trait Lockable {
    /// Acquire the resource if that is possible without blocking
    fn try_acquire(&self) -> Acquire;

    /// Block until the resource is acquired
    ///
    /// Never returns [`Acquire::Contended`].
    fn acquire(&self) -> Acquire;

    /// Block until the resource is acquired or the deadline is reached
    ///
    /// Returns [`Acquire::Contended`] if the deadline is reached.
    fn acquire_until(&self, deadline: Instant) -> Acquire;

    /// Release the resource
    ///
    /// # Safety
    ///
    /// The calling thread must hold the resource, having acquired it through one of the
    /// acquire methods, and must not have released it since.
    unsafe fn release(&self);
}


/// Exclusive lock which remembers its owning thread
///
/// Built from a mutex and a condvar. Because it knows its owner, acquiring it again from the
/// thread that holds it is reported as [`Acquire::HeldByCaller`] instead of deadlocking.
#[derive(Default)]
pub struct ExclusiveLock {
    // the owning thread, if held.
    owner: Mutex<Option<ThreadId>>,
    // notified when released.
    cond: Condvar,
}

impl ExclusiveLock {
    /// Construct, not held by anyone
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether some thread currently holds this lock
    pub fn is_locked(&self) -> bool {
        self.owner().is_some()
    }

    /// Whether the calling thread currently holds this lock
    pub fn is_held_by_current_thread(&self) -> bool {
        *self.owner() == Some(thread::current().id())
    }

    // lock the owner field. the critical sections never panic, so poison is ignored.
    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // block until the owner is none or the deadline is reached, then claim it.
    fn acquire_inner(&self, deadline: Option<Instant>) -> Acquire {
        let me = thread::current().id();
        let mut owner = self.owner();
        loop {
            match *owner {
                None => {
                    *owner = Some(me);
                    return Acquire::Acquired;
                }
                Some(id) if id == me => return Acquire::HeldByCaller,
                Some(_) => (),
            }
            owner = match deadline {
                None => self.cond.wait(owner).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let Some(duration) =
                        deadline.checked_duration_since(Instant::now())
                        else { return Acquire::Contended };
                    self.cond.wait_timeout(owner, duration)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

impl Lockable for ExclusiveLock {
    fn try_acquire(&self) -> Acquire {
        let me = thread::current().id();
        let mut owner = self.owner();
        match *owner {
            None => {
                *owner = Some(me);
                Acquire::Acquired
            }
            Some(id) if id == me => Acquire::HeldByCaller,
            Some(_) => Acquire::Contended,
        }
    }

    fn acquire(&self) -> Acquire {
        self.acquire_inner(None)
    }

    fn acquire_until(&self, deadline: Instant) -> Acquire {
        self.acquire_inner(Some(deadline))
    }

    unsafe fn release(&self) {
        let mut owner = self.owner();
        debug_assert_eq!(*owner, Some(thread::current().id()), "released by non-owner");
        *owner = None;
        drop(owner);
        self.cond.notify_one();
    }
}

impl Debug for ExclusiveLock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("ExclusiveLock")
            .field("owner", &*self.owner())
            .finish()
    }
}
