// exposed API of result channels

use super::{
    error::*,
    core::Cell,
};
use crate::{
    record::ErrorRecord,
    util::Timeout,
};
use std::{
    fmt::{self, Debug, Formatter},
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
    time::{Duration, Instant},
};


// convert whether the core observed a deposit into a wait status.
fn wait_status(deposited: bool) -> WaitStatus {
    if deposited {
        WaitStatus::Ready
    } else {
        WaitStatus::Pending
    }
}


// ==== the exposed API ====


/// Create a single-assignment result channel
///
/// The [`ResultSource`] may deposit one value or one [`ErrorRecord`], which the [`ResultSink`]
/// may retrieve once. Neither handle can be cloned, so there is only ever one producer and one
/// consumer, though either handle may be moved to another thread.
///
/// ```
/// use lockstep::channel;
/// use std::thread;
///
/// let (mut source, mut sink) = channel();
/// let producer = thread::spawn(move || {
///     source.set_value(42).unwrap();
/// });
/// assert_eq!(sink.get().unwrap(), 42);
/// producer.join().unwrap();
/// ```
pub fn channel<T>() -> (ResultSource<T>, ResultSink<T>) {
    let cell_1 = Cell::new();
    let cell_2 = Arc::clone(&cell_1);
    (ResultSource(cell_1), ResultSink(cell_2))
}


/// Producer half of a result channel
///
/// Dropping this handle without depositing breaks the channel: the sink then fails with
/// [`BrokenChannelError`] rather than blocking forever.
pub struct ResultSource<T>(Arc<Cell<T>>);

impl<T> ResultSource<T> {
    /// Deposit a value and wake the consumer
    ///
    /// Errors if a value or error was already deposited, in which case the channel retains the
    /// first deposit and `val` is dropped.
    pub fn set_value(&mut self, val: T) -> Result<(), AlreadySetError> {
        self.0.deposit(Ok(val))
    }

    /// Deposit an error and wake the consumer
    ///
    /// The consumer receives the record unchanged, as [`GetError::Failed`]. Errors if a value or
    /// error was already deposited, in which case the channel retains the first deposit.
    pub fn set_error(&mut self, error: impl Into<ErrorRecord>) -> Result<(), AlreadySetError> {
        self.0.deposit(Err(error.into()))
    }

    /// Run `f` and deposit its outcome
    ///
    /// `Ok` is deposited as a value and `Err` as an error. If `f` panics, the panic is caught
    /// and deposited as an error record of kind [`ErrorRecord::PANIC_KIND`], so the consumer
    /// observes the failure instead of a broken channel.
    ///
    /// Errors without running `f` if something was already deposited.
    pub fn fulfill<F, E>(&mut self, f: F) -> Result<(), AlreadySetError>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<ErrorRecord>,
    {
        if self.0.is_resolved() {
            return Err(AlreadySetError);
        }
        let payload = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(result) => result.map_err(Into::into),
            Err(panic) => Err(ErrorRecord::from_panic(panic)),
        };
        self.0.deposit(payload)
    }

    /// Drop this handle, breaking the channel if nothing was deposited
    pub fn abandon(self) {
        drop(self);
    }

    /// Whether the sink has been dropped
    ///
    /// Depositing into a closed channel still succeeds, but nobody will ever retrieve it.
    pub fn is_closed(&self) -> bool {
        !self.0.sink_alive()
    }
}

impl<T> Drop for ResultSource<T> {
    fn drop(&mut self) {
        self.0.drop_source();
    }
}

impl<T> Debug for ResultSource<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("ResultSource").finish_non_exhaustive()
    }
}


/// Consumer half of a result channel
pub struct ResultSink<T>(Arc<Cell<T>>);

impl<T> ResultSink<T> {
    /// Block until the producer deposits, then retrieve the deposit
    ///
    /// Returns the deposited value, or [`GetError::Failed`] with the deposited error record.
    /// Either way the channel is consumed, and calling this again fails with
    /// [`AlreadyConsumedError`]. Fails with [`BrokenChannelError`] if the source is dropped
    /// without depositing.
    pub fn get(&mut self) -> Result<T, GetError> {
        match self.0.take(Timeout::Never)? {
            Some(val) => Ok(val),
            None => unreachable!("take timed out with Timeout::Never"),
        }
    }

    /// Retrieve the deposit if it is available without blocking
    ///
    /// Returns `Ok(None)` if nothing was deposited yet, in which case the channel is unchanged.
    /// Otherwise behaves like [`get`](Self::get).
    pub fn try_get(&mut self) -> Result<Option<T>, GetError> {
        self.0.take(Timeout::NonBlocking)
    }

    /// Block until the producer deposits, without retrieving the deposit
    pub fn wait(&self) -> Result<(), WaitError> {
        self.0.wait(Timeout::Never).map(|_| ())
    }

    /// Block until the producer deposits or a timeout elapses, without retrieving the deposit
    ///
    /// Returns [`WaitStatus::Pending`] on timeout, leaving the channel unchanged, so this may be
    /// called repeatedly. A zero timeout never blocks.
    pub fn wait_for(&self, timeout: Duration) -> Result<WaitStatus, WaitError> {
        self.0.wait(Timeout::after(timeout)).map(wait_status)
    }

    /// Block until the producer deposits or the deadline is reached, without retrieving the
    /// deposit
    pub fn wait_until(&self, deadline: Instant) -> Result<WaitStatus, WaitError> {
        self.0.wait(Timeout::At(deadline)).map(wait_status)
    }

    /// Whether [`get`](Self::get) would return without blocking
    ///
    /// This is the case once something was deposited, but also once the channel is broken or
    /// consumed.
    pub fn is_ready(&self) -> bool {
        self.0.is_resolved()
    }
}

impl<T> Drop for ResultSink<T> {
    fn drop(&mut self) {
        self.0.drop_sink();
    }
}

impl<T> Debug for ResultSink<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("ResultSink")
            .field("is_ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}


/// Outcome of waiting on a [`ResultSink`] with a timeout
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WaitStatus {
    /// Something was deposited, so retrieving will not block
    Ready,
    /// The timeout elapsed before anything was deposited
    Pending,
}

impl WaitStatus {
    /// Whether this is [`WaitStatus::Ready`]
    pub fn is_ready(self) -> bool {
        self == WaitStatus::Ready
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::{
        sync::Barrier,
        thread,
    };

    #[test]
    fn value_round_trip() {
        let (mut source, mut sink) = channel();
        source.set_value(String::from("hello")).unwrap();
        assert_eq!(sink.get().unwrap(), "hello");
    }

    #[test]
    fn error_round_trip() {
        let (mut source, mut sink) = channel::<u32>();
        let record = ErrorRecord::new("out_of_range", "oops");
        source.set_error(record.clone()).unwrap();
        let e = sink.get().unwrap_err();
        assert!(!e.is_contract_violation());
        let got = e.into_record().unwrap();
        assert_eq!(got, record);
        assert_eq!(got.kind(), "out_of_range");
        assert_eq!(got.message(), "oops");
    }

    #[test]
    fn get_twice() {
        let (mut source, mut sink) = channel();
        source.set_value(1u8).unwrap();
        assert_eq!(sink.get(), Ok(1));
        let e = sink.get().unwrap_err();
        assert_eq!(e, GetError::AlreadyConsumed(AlreadyConsumedError));
        assert!(e.is_contract_violation());
        assert_eq!(sink.wait_for(Duration::ZERO), Err(AlreadyConsumedError.into()));
        assert!(sink.is_ready());

        let (mut source, mut sink) = channel::<u8>();
        source.set_error("bad").unwrap();
        assert!(matches!(sink.get(), Err(GetError::Failed(_))));
        assert_eq!(sink.get(), Err(AlreadyConsumedError.into()));
    }

    #[test]
    fn set_twice_keeps_first() {
        let (mut source, mut sink) = channel();
        source.set_value(1u8).unwrap();
        assert_eq!(source.set_error("late"), Err(AlreadySetError));
        assert_eq!(source.set_value(2), Err(AlreadySetError));
        assert_eq!(sink.get(), Ok(1));

        let (mut source, mut sink) = channel::<u8>();
        source.set_error("first").unwrap();
        assert_eq!(source.set_value(2), Err(AlreadySetError));
        let record = sink.get().unwrap_err().into_record().unwrap();
        assert_eq!(record.message(), "first");

        // still rejected after consumption
        assert_eq!(source.set_value(3), Err(AlreadySetError));
    }

    #[test]
    fn consumer_blocks_until_deposit() {
        let (mut source, mut sink) = channel();
        let barrier_1 = Arc::new(Barrier::new(2));
        let barrier_2 = Arc::clone(&barrier_1);

        let producer = thread::spawn(move || {
            barrier_1.wait();
            thread::sleep(Duration::from_millis(100));
            let deposited_at = Instant::now();
            source.set_value(42).unwrap();
            deposited_at
        });
        let consumer = thread::spawn(move || {
            barrier_2.wait();
            let val = sink.get().unwrap();
            (val, Instant::now())
        });

        let deposited_at = producer.join().expect("producer panicked");
        let (val, returned_at) = consumer.join().expect("consumer panicked");
        assert_eq!(val, 42);
        assert!(returned_at >= deposited_at);
    }

    #[test]
    fn wait_for_zero_on_broken() {
        let (source, sink) = channel::<u32>();
        assert_eq!(sink.wait_for(Duration::ZERO), Ok(WaitStatus::Pending));
        assert!(!sink.is_ready());
        source.abandon();
        assert_eq!(sink.wait_for(Duration::ZERO), Err(BrokenChannelError.into()));
        assert!(sink.is_ready());
    }

    #[test]
    fn get_on_broken() {
        let (source, mut sink) = channel::<u32>();
        let dropper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(source);
        });
        assert_eq!(sink.get(), Err(BrokenChannelError.into()));
        dropper.join().unwrap();
    }

    #[test]
    fn deposit_survives_source_drop() {
        let (mut source, mut sink) = channel();
        source.set_value(vec![1, 2, 3]).unwrap();
        drop(source);
        assert_eq!(sink.wait_for(Duration::ZERO), Ok(WaitStatus::Ready));
        assert_eq!(sink.get().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn wait_for_is_retry_safe() {
        let (mut source, mut sink) = channel();
        for _ in 0..3 {
            assert_eq!(sink.wait_for(Duration::from_millis(5)), Ok(WaitStatus::Pending));
        }
        assert_eq!(sink.try_get(), Ok(None));
        source.set_value('x').unwrap();
        assert!(sink.wait_for(Duration::from_millis(5)).unwrap().is_ready());
        assert!(sink.wait_until(Instant::now()).unwrap().is_ready());
        sink.wait().unwrap();
        assert_eq!(sink.try_get(), Ok(Some('x')));
    }

    #[test]
    fn wait_for_wakes_on_deposit() {
        let (mut source, sink) = channel();
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            source.set_value(()).unwrap();
        });
        assert_eq!(sink.wait_for(Duration::from_secs(30)), Ok(WaitStatus::Ready));
        producer.join().unwrap();
    }

    #[test]
    fn huge_timeout_does_not_overflow() {
        let (mut source, sink) = channel();
        source.set_value(0).unwrap();
        assert_eq!(sink.wait_for(Duration::MAX), Ok(WaitStatus::Ready));
    }

    #[test]
    fn fulfill_outcomes() {
        let (mut source, mut sink) = channel();
        source.fulfill(|| Ok::<_, ErrorRecord>(10)).unwrap();
        assert_eq!(sink.get(), Ok(10));

        let (mut source, mut sink) = channel::<u32>();
        source.fulfill(|| Err(anyhow!("no luck"))).unwrap();
        let record = sink.get().unwrap_err().into_record().unwrap();
        assert_eq!(record.message(), "no luck");

        let (mut source, mut sink) = channel::<u32>();
        source.fulfill(|| -> Result<u32, ErrorRecord> { panic!("worker exploded") }).unwrap();
        let record = sink.get().unwrap_err().into_record().unwrap();
        assert!(record.is_panic());
        assert_eq!(record.message(), "worker exploded");
    }

    #[test]
    fn fulfill_after_set_does_not_run() {
        let (mut source, mut sink) = channel();
        source.set_value(1).unwrap();
        let mut ran = false;
        let result = source.fulfill(|| {
            ran = true;
            Ok::<_, ErrorRecord>(2)
        });
        assert_eq!(result, Err(AlreadySetError));
        assert!(!ran);
        assert_eq!(sink.get(), Ok(1));
    }

    #[test]
    fn closed_when_sink_dropped() {
        let (mut source, sink) = channel();
        assert!(!source.is_closed());
        drop(sink);
        assert!(source.is_closed());
        assert_eq!(source.set_value(5), Ok(()));
    }

    #[test]
    fn handles_move_between_threads() {
        let (source, sink) = channel::<Vec<u64>>();
        let producer = thread::spawn(move || {
            let mut source = source;
            source.set_value((0..1000).collect()).unwrap();
        });
        let consumer = thread::spawn(move || {
            let mut sink = sink;
            sink.get().unwrap().iter().sum::<u64>()
        });
        producer.join().unwrap();
        assert_eq!(consumer.join().unwrap(), 499_500);
    }

    #[test]
    fn stress_deposit_happens_before_get() {
        // each producer writes a fully-built vec, each consumer checks it is whole.
        const CHANNELS: usize = 200;
        let mut sources = Vec::new();
        let mut sinks = Vec::new();
        for _ in 0..CHANNELS {
            let (source, sink) = channel::<Vec<usize>>();
            sources.push(source);
            sinks.push(sink);
        }
        let producer = thread::spawn(move || {
            for (i, mut source) in sources.into_iter().enumerate() {
                source.set_value(vec![i; i + 1]).unwrap();
            }
        });
        let consumer = thread::spawn(move || {
            for (i, mut sink) in sinks.into_iter().enumerate() {
                let val = sink.get().unwrap();
                assert_eq!(val.len(), i + 1);
                assert!(val.iter().all(|&n| n == i));
            }
        });
        producer.join().expect("producer panicked");
        consumer.join().expect("consumer panicked");
    }
}
