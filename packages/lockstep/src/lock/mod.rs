// deadlock-avoiding acquisition of multiple exclusive resources.
//
// the organization of these modules is as such:
//
//      raw: The Lockable trait, which is the interface a resource must expose (try-acquire,
//       ^   acquire, acquire with deadline, release), and ExclusiveLock, a ready-made resource
//       |   which remembers its owning thread so reentrant acquisition can be detected.
//       |
//      acquire: The acquisition protocol. It never blocks while holding anything: it blocks on
//       |       one resource while holding nothing, then sweeps the rest with try-acquire, and
//       |       on contention releases everything and starts over by blocking on the contended
//       |       resource.
//       v
//      guard: ScopedMultiLock, which owns the acquired set and releases it in reverse order.
//
// there is also the error module, which contains the relevant error types, which is also
// re-exported publically.

pub(crate) mod error;
pub(crate) mod raw;
pub(crate) mod acquire;
pub(crate) mod guard;

// this many acquired resources are tracked without a heap allocation.
const INLINE_LOCKS: usize = 4;
