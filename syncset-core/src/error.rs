use thiserror::Error;

use crate::data_structures::Key;

/// Errors raised when building a set or registering a worker.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetError {
    #[error("all {capacity} worker slots are in use")]
    NoFreeWorkerSlot { capacity: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),
}

/// A disagreement between recorded operation results and the final set.
///
/// Any of these means the strategy (or its reclamation scheme) is not
/// linearizable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("value {value} was removed while it was not in the set (tally {tally})")]
    RemovedWhileAbsent { value: Key, tally: i64 },

    #[error("value {value} was added while the set already had it (tally {tally})")]
    AddedWhilePresent { value: Key, tally: i64 },

    #[error("value {value} should not exist but the set contains it")]
    WronglyPresent { value: Key },

    #[error("value {value} should exist but the set does not contain it")]
    WronglyAbsent { value: Key },
}

impl ConsistencyError {
    /// The value the check failed on.
    pub fn value(&self) -> Key {
        match self {
            ConsistencyError::RemovedWhileAbsent { value, .. }
            | ConsistencyError::AddedWhilePresent { value, .. }
            | ConsistencyError::WronglyPresent { value }
            | ConsistencyError::WronglyAbsent { value } => *value,
        }
    }
}
