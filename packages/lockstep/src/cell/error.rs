// result channel error types.

use crate::record::ErrorRecord;
use thiserror::Error;


// ==== base error types ====


/// Error for trying to deposit into a channel which already holds (or held) a deposit
///
/// This is a usage contract violation: each channel accepts exactly one call to
/// [`set_value`](crate::ResultSource::set_value) or [`set_error`](crate::ResultSource::set_error).
/// The channel retains its first deposit.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("result channel already set")]
pub struct AlreadySetError;

/// Error for trying to retrieve from a channel which has already been retrieved from
///
/// This is a usage contract violation: each channel yields its deposit exactly once.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("result channel already consumed")]
pub struct AlreadyConsumedError;

/// Error for trying to retrieve from a channel whose source was dropped without depositing
///
/// No value or error will ever arrive. This is a recoverable runtime condition: the producer
/// died, was cancelled, or never ran.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[error("result channel broken: source dropped without depositing")]
pub struct BrokenChannelError;


// ==== compound error types ====


/// Error for retrieving from a channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GetError {
    /// The producer deposited an error, which is passed through unchanged
    #[error(transparent)]
    Failed(ErrorRecord),
    /// The deposit was already retrieved
    #[error(transparent)]
    AlreadyConsumed(#[from] AlreadyConsumedError),
    /// The source was dropped without depositing
    #[error(transparent)]
    Broken(#[from] BrokenChannelError),
}

impl From<ErrorRecord> for GetError {
    fn from(record: ErrorRecord) -> Self {
        GetError::Failed(record)
    }
}

impl GetError {
    /// The producer's error record, if that is what this is
    pub fn into_record(self) -> Option<ErrorRecord> {
        match self {
            GetError::Failed(record) => Some(record),
            _ => None,
        }
    }

    /// Whether this is a usage contract violation rather than a runtime condition
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, GetError::AlreadyConsumed(_))
    }
}

/// Error for waiting on a channel without retrieving from it
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum WaitError {
    /// The deposit was already retrieved
    #[error(transparent)]
    AlreadyConsumed(#[from] AlreadyConsumedError),
    /// The source was dropped without depositing
    #[error(transparent)]
    Broken(#[from] BrokenChannelError),
}

impl From<WaitError> for GetError {
    fn from(e: WaitError) -> Self {
        match e {
            WaitError::AlreadyConsumed(e) => e.into(),
            WaitError::Broken(e) => e.into(),
        }
    }
}
