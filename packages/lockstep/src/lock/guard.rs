//! RAII guard for an acquired lock set.

use super::{raw::Lockable, INLINE_LOCKS};
use smallvec::SmallVec;
use std::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
};


/// Guard for a fully acquired lock set
///
/// Returned by [`acquire_all`](crate::acquire_all) and the other acquisition functions. While it
/// exists, the calling thread holds every resource of the lock set. When it is dropped, by
/// falling out of scope, an early return, or a panic unwinding through the owning scope, it
/// releases each of them exactly once, in reverse acquisition order.
///
/// ```
/// use lockstep::{acquire_all, ExclusiveLock};
///
/// let a = ExclusiveLock::new();
/// let b = ExclusiveLock::new();
/// {
///     let guard = acquire_all(&[&a, &b]).unwrap();
///     assert_eq!(guard.len(), 2);
///     assert!(a.is_locked() && b.is_locked());
/// }
/// assert!(!a.is_locked() && !b.is_locked());
/// ```
pub struct ScopedMultiLock<'a> {
    // (position in the lock set, resource), in acquisition order.
    //
    // invariant: every resource in here is held by the thread that created this guard, and is
    // released exactly once, by drop.
    held: SmallVec<[(usize, &'a dyn Lockable); INLINE_LOCKS]>,

    /// Suppresses Send and Sync autotraits for ScopedMultiLock, as resources must be released by
    /// the thread that acquired them.
    _p: PhantomData<*mut ()>,
}

impl<'a> ScopedMultiLock<'a> {
    // take ownership of resources already acquired by the calling thread.
    //
    // safety: every resource in `held` must be held by the calling thread and not owned by any
    //         other guard.
    pub(crate) unsafe fn adopt(
        held: SmallVec<[(usize, &'a dyn Lockable); INLINE_LOCKS]>,
    ) -> Self {
        ScopedMultiLock { held, _p: PhantomData }
    }

    /// Number of resources held
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Whether the lock set was empty
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Positions in the lock set of the held resources, in the order they were acquired
    ///
    /// They will be released in the reverse of this order.
    pub fn acquisition_order(&self) -> Vec<usize> {
        self.held.iter().map(|&(index, _)| index).collect()
    }

    /// Release all resources now
    ///
    /// Equivalent to dropping the guard.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<'a> Drop for ScopedMultiLock<'a> {
    fn drop(&mut self) {
        while let Some((index, resource)) = self.held.pop() {
            // safety: the type invariant guarantees we hold it, and popping it guarantees we
            //         don't release it again. the guard is not Send, so this is the acquiring
            //         thread.
            unsafe { resource.release() };
            trace!(index, "released resource");
        }
    }
}

impl<'a> Debug for ScopedMultiLock<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("ScopedMultiLock")
            .field("acquisition_order", &self.acquisition_order())
            .finish()
    }
}
