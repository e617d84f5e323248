// implementation of the single-assignment result channel.
//
// the architecture is as such:
//
// channel handles wrap around Arc<shared cell>
//                                   |
//          /------------------------/
//          v
//       shared cell
//          |
//          |------ it contains a mutex around the slot, which is one of empty, value, error, or
//          |       consumed, plus flags for whether the source and sink handles are still alive.
//          |
//          \------ it contains a condvar, which is notified whenever the slot leaves the empty
//                  state or the source handle goes away while the slot is still empty.
//
// the organization of these modules is as such:
//
//      core: The shared cell. It enforces the state machine and owns the blocking logic, but
//       ^    knows nothing about handles.
//       |
//      api: The move-only source and sink handles wrapped around the core. The crate re-exports
//           this API publically.
//
// there is also the error module, which contains the relevant error types, which is also
// re-exported publically.

pub(crate) mod error;
pub(crate) mod api;

mod core;
