// minimal safe core of the result channel. the exposed API is a convenience wrapper around this.

use super::error::*;
use crate::{
    record::ErrorRecord,
    util::Timeout,
};
use std::{
    mem::replace,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    time::Instant,
};


// shared cell behind a pair of handles.
pub(crate) struct Cell<T> {
    // mutex around lockable state.
    lockable: Mutex<Lockable<T>>,
    // notified when the slot leaves Empty, or when it becomes broken.
    cond: Condvar,
}

// cell lockable state.
struct Lockable<T> {
    // begins as Slot::Empty.
    //
    // - changes from Empty to Value or Error at most once.
    // - changes from Value or Error to Consumed at most once.
    // - never changes again once Consumed.
    slot: Slot<T>,
    // whether the source handle still exists. once false, never true again.
    //
    // if this is false and the slot is Empty, the cell is broken.
    source_alive: bool,
    // whether the sink handle still exists. once false, never true again.
    sink_alive: bool,
}

// possible values for Lockable.slot
enum Slot<T> {
    // nothing deposited yet.
    Empty,
    // a value was deposited and not yet retrieved.
    Value(T),
    // an error was deposited and not yet retrieved.
    Error(ErrorRecord),
    // the deposit was retrieved.
    Consumed,
}

impl<T> Cell<T> {
    // construct empty cell with both handles alive.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Cell {
            lockable: Mutex::new(Lockable {
                slot: Slot::Empty,
                source_alive: true,
                sink_alive: true,
            }),
            cond: Condvar::new(),
        })
    }

    // lock the cell.
    //
    // no user code ever runs while this mutex is held, and every state change is a single
    // assignment, so a poisoned mutex still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, Lockable<T>> {
        self.lockable.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // move Empty -> Value or Error and wake all waiters.
    //
    // errors if the slot is not Empty, in which case the slot is left untouched.
    pub(crate) fn deposit(&self, payload: Result<T, ErrorRecord>) -> Result<(), AlreadySetError> {
        let mut lock = self.lock();
        if !matches!(&lock.slot, Slot::Empty) {
            return Err(AlreadySetError);
        }
        let is_err = payload.is_err();
        lock.slot = match payload {
            Ok(val) => Slot::Value(val),
            Err(record) => Slot::Error(record),
        };
        if !lock.sink_alive {
            warn!(is_err, "deposited into result channel with no sink, deposit will be dropped");
        } else {
            trace!(is_err, "deposited into result channel");
        }
        drop(lock);
        self.cond.notify_all();
        Ok(())
    }

    // mark the source handle as gone. if nothing was deposited, this breaks the cell and wakes
    // all waiters so they can observe that.
    pub(crate) fn drop_source(&self) {
        let mut lock = self.lock();
        debug_assert!(lock.source_alive, "internal bug");
        lock.source_alive = false;
        if matches!(&lock.slot, Slot::Empty) {
            trace!("result channel source dropped without depositing, channel broken");
            drop(lock);
            self.cond.notify_all();
        }
    }

    // mark the sink handle as gone.
    pub(crate) fn drop_sink(&self) {
        let mut lock = self.lock();
        debug_assert!(lock.sink_alive, "internal bug");
        lock.sink_alive = false;
    }

    // whether the sink handle still exists.
    pub(crate) fn sink_alive(&self) -> bool {
        self.lock().sink_alive
    }

    // whether a deposit or a terminal condition is present right now.
    pub(crate) fn is_resolved(&self) -> bool {
        let lock = self.lock();
        !matches!(&lock.slot, Slot::Empty) || !lock.source_alive
    }

    // block until the slot holds a deposit, the cell is consumed or broken, or timeout is
    // reached.
    //
    // - on deposit, returns the lock with the slot being Value or Error.
    // - on timeout, returns none.
    fn wait_deposit(
        &self,
        timeout: &Timeout,
    ) -> Result<Option<MutexGuard<'_, Lockable<T>>>, WaitError> {
        let mut lock = self.lock();
        loop {
            let deposited = match &lock.slot {
                Slot::Value(_) | Slot::Error(_) => true,
                Slot::Consumed => return Err(AlreadyConsumedError.into()),
                Slot::Empty if !lock.source_alive => return Err(BrokenChannelError.into()),
                Slot::Empty => false,
            };
            if deposited {
                return Ok(Some(lock));
            }
            match timeout {
                // block on mutex + condvar indefinitely
                &Timeout::Never => {
                    lock = self.cond.wait(lock).unwrap_or_else(PoisonError::into_inner);
                }

                // block on mutex + condvar until deadline, at which point return none
                &Timeout::At(deadline) => {
                    let Some(duration) =
                        deadline.checked_duration_since(Instant::now())
                        else { return Ok(None) };
                    // spurious wakeups and timeouts both go back through the slot check, so a
                    // deposit racing with the deadline is still observed
                    lock = self.cond.wait_timeout(lock, duration)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }

                // dont block on mutex + condvar, return none instead
                &Timeout::NonBlocking => return Ok(None),
            }
        }
    }

    // block until a deposit is available without consuming it.
    //
    // returns whether a deposit is available, false meaning the timeout was reached.
    pub(crate) fn wait(&self, timeout: Timeout) -> Result<bool, WaitError> {
        self.wait_deposit(&timeout).map(|lock| lock.is_some())
    }

    // block until a deposit is available and consume it.
    //
    // returns none if the timeout was reached, in which case the state is unchanged.
    pub(crate) fn take(&self, timeout: Timeout) -> Result<Option<T>, GetError> {
        let Some(mut lock) = self.wait_deposit(&timeout)? else { return Ok(None) };
        match replace(&mut lock.slot, Slot::Consumed) {
            Slot::Value(val) => {
                trace!("retrieved value from result channel");
                Ok(Some(val))
            }
            Slot::Error(record) => {
                trace!(kind = record.kind(), "retrieved error from result channel");
                Err(GetError::Failed(record))
            }
            Slot::Empty | Slot::Consumed => unreachable!("internal bug"),
        }
    }
}
