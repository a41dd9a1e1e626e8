//! Service-level error taxonomy shared by every marketplace entry point.

use crate::marketplace::{
    domain::{BidId, LifecycleViolation, TaskId, TaskStatus, ValidationError},
    ports::StoreError,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse classification callers map onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, rejected before any storage access.
    Validation,
    /// A referenced task or bid does not exist.
    NotFound,
    /// The request contradicts the current lifecycle state.
    Conflict,
    /// Contention, timeout, or connectivity; retrying may succeed.
    TransientStorage,
    /// Any other storage failure.
    Storage,
}

impl ErrorKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::TransientStorage => "transient_storage",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by marketplace services.
#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    /// Input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The bid does not exist.
    #[error("bid not found: {0}")]
    BidNotFound(BidId),

    /// The task no longer accepts bids.
    #[error("task {task_id} is {status} and no longer accepts bids")]
    TaskNotOpen {
        /// The task bid on.
        task_id: TaskId,
        /// Its status inside the submitting transaction.
        status: TaskStatus,
    },

    /// A lifecycle guard failed.
    #[error(transparent)]
    Conflict(#[from] LifecycleViolation),

    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl MarketplaceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TaskNotFound(_) | Self::BidNotFound(_) => ErrorKind::NotFound,
            Self::TaskNotOpen { .. } | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(err) if err.is_transient() => ErrorKind::TransientStorage,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns `true` when retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::TransientStorage)
    }
}

/// Result type for marketplace service operations.
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;
