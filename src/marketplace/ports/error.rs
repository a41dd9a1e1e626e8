//! Storage error and write-outcome types shared by every marketplace port.

use crate::marketplace::domain::{BidId, TaskId};
use std::sync::Arc;
use thiserror::Error;

/// Result type for marketplace storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by marketplace storage implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// A bid with the same identifier already exists.
    #[error("duplicate bid identifier: {0}")]
    DuplicateBid(BidId),

    /// The storage backend could not be reached in time (pool timeout,
    /// closed connection, poisoned lock, cancelled worker).
    #[error("storage unavailable: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),

    /// The storage backend aborted the transaction (serialization failure,
    /// deadlock, concurrent unique insert).
    #[error("transaction aborted: {0}")]
    Aborted(Arc<dyn std::error::Error + Send + Sync>),

    /// Any other persistence-layer failure, including undecodable rows.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a connectivity or timeout failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }

    /// Wraps a transaction abort.
    pub fn aborted(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Aborted(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns `true` when retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Aborted(_))
    }
}

/// Outcome of a filtered write.
///
/// Writes that match nothing are reported rather than treated as success, so
/// every caller decides what a missed match means.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// At least one record matched the filter and was written.
    Applied,
    /// No record matched the filter.
    Unmatched,
}

impl WriteOutcome {
    /// Classifies an affected-row count.
    pub const fn from_affected(rows: usize) -> Self {
        if rows == 0 {
            Self::Unmatched
        } else {
            Self::Applied
        }
    }

    /// Returns `true` when the write matched.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Converts an unmatched write into the caller's error.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `unmatched` when nothing was written.
    pub fn require<E>(self, unmatched: impl FnOnce() -> E) -> Result<(), E> {
        match self {
            Self::Applied => Ok(()),
            Self::Unmatched => Err(unmatched()),
        }
    }
}
