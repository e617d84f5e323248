// multi-lock error types.

use thiserror::Error;


// ==== base error types ====


/// Error for trying to acquire a resource the calling thread already holds
///
/// This is a usage contract violation. It also occurs if the same resource is listed more than
/// once in a single lock set. When it is returned, nothing from the lock set is held.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("resource {index} of the lock set is already held by the calling thread")]
pub struct ReentrantAcquireError {
    /// Position of the offending resource in the lock set
    pub index: usize,
}

/// Error for a bounded acquisition reaching its deadline
///
/// When it is returned, nothing from the lock set is held.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("timed out waiting for resource {index} of the lock set")]
pub struct AcquireTimeoutError {
    /// Position of the resource that was being waited on when the deadline was reached
    pub index: usize,
}

/// Error for a non-blocking acquisition finding a resource held by another thread
///
/// When it is returned, nothing from the lock set is held.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("resource {index} of the lock set is held by another thread")]
pub struct ContendedError {
    /// Position of the first contended resource
    pub index: usize,
}


// ==== compound error types ====


/// Error for acquiring a lock set with a timeout
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AcquireError {
    /// A resource is already held by the calling thread
    #[error(transparent)]
    Reentrant(#[from] ReentrantAcquireError),
    /// The deadline was reached
    #[error(transparent)]
    Timeout(#[from] AcquireTimeoutError),
}

/// Error for acquiring a lock set without blocking
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TryLockError {
    /// A resource is already held by the calling thread
    #[error(transparent)]
    Reentrant(#[from] ReentrantAcquireError),
    /// A resource is held by another thread
    #[error(transparent)]
    Contended(#[from] ContendedError),
}

impl AcquireError {
    /// Position of the resource the acquisition failed on
    pub fn index(&self) -> usize {
        match self {
            AcquireError::Reentrant(e) => e.index,
            AcquireError::Timeout(e) => e.index,
        }
    }
}

impl TryLockError {
    /// Position of the resource the acquisition failed on
    pub fn index(&self) -> usize {
        match self {
            TryLockError::Reentrant(e) => e.index,
            TryLockError::Contended(e) => e.index,
        }
    }
}
