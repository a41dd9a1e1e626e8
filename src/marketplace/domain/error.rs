//! Error types for marketplace domain validation and lifecycle guards.

use super::{BidId, BidStatus, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned while constructing domain values from raw input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The client identifier is empty or malformed.
    #[error("invalid client id '{0}': expected 1-128 non-whitespace characters")]
    InvalidClientId(String),

    /// The bidder identifier is empty or malformed.
    #[error("invalid bidder id '{0}': expected 1-128 non-whitespace characters")]
    InvalidBidderId(String),

    /// The idempotency key is empty, too long, or contains invisible characters.
    #[error("invalid idempotency key: expected 1-128 visible ASCII characters")]
    InvalidIdempotencyKey,

    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The task title exceeds the length limit.
    #[error("task title has {actual} characters, exceeds limit of {max}")]
    TitleTooLong {
        /// The maximum permitted length.
        max: usize,
        /// The actual length.
        actual: usize,
    },

    /// The task description exceeds the length limit.
    #[error("task description has {actual} characters, exceeds limit of {max}")]
    DescriptionTooLong {
        /// The maximum permitted length.
        max: usize,
        /// The actual length.
        actual: usize,
    },

    /// The bid message exceeds the length limit.
    #[error("bid message has {actual} characters, exceeds limit of {max}")]
    MessageTooLong {
        /// The maximum permitted length.
        max: usize,
        /// The actual length.
        actual: usize,
    },

    /// Stored optional text was present but blank.
    #[error("optional text must be omitted rather than blank")]
    BlankText,

    /// A monetary amount is zero or not representable in storage.
    #[error("invalid amount {0}, expected a positive integer no larger than i64::MAX")]
    InvalidAmount(u64),

    /// A task identifier could not be parsed.
    #[error("invalid task id '{0}'")]
    InvalidTaskId(String),

    /// A bid identifier could not be parsed.
    #[error("invalid bid id '{0}'")]
    InvalidBidId(String),

    /// An update request carried no fields to change.
    #[error("update must change at least one field")]
    EmptyUpdate,

    /// A status filter value is not a known task status.
    #[error(transparent)]
    UnknownTaskStatus(#[from] ParseTaskStatusError),
}

/// Attempted lifecycle transition that would break a marketplace invariant.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LifecycleViolation {
    /// The task no longer accepts bids or assignment.
    #[error("task {task_id} is {status}, expected open")]
    TaskNotOpen {
        /// The task in question.
        task_id: TaskId,
        /// The status observed inside the transaction.
        status: TaskStatus,
    },

    /// The bid has already been decided.
    #[error("bid {bid_id} is {status}, expected pending")]
    BidNotPending {
        /// The bid in question.
        bid_id: BidId,
        /// The status observed inside the transaction.
        status: BidStatus,
    },
}

/// Error returned while parsing task statuses from persistence or queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing bid statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown bid status: {0}")]
pub struct ParseBidStatusError(pub String);
