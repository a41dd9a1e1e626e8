//! Bid entity and its terminal-state lifecycle.

use super::{
    Amount, BidId, BidMessage, BidderId, IdempotencyKey, LifecycleViolation, ParseBidStatusError,
    TaskId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bid decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    /// Awaiting the client's decision.
    Pending,
    /// The winning bid for its task.
    Accepted,
    /// Lost to a sibling bid.
    Rejected,
}

impl BidStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` once the bid has been decided.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl TryFrom<&str> for BidStatus {
    type Error = ParseBidStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseBidStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated input for a new bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidSubmission {
    /// Task being bid on.
    pub task_id: TaskId,
    /// Bidder making the offer.
    pub bidder_id: BidderId,
    /// Offered amount.
    pub amount: Amount,
    /// Optional note to the client.
    pub message: Option<BidMessage>,
    /// Optional deduplication token for retried submissions.
    pub idempotency_key: Option<IdempotencyKey>,
}

/// A bidder's offer against a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    id: BidId,
    task_id: TaskId,
    bidder_id: BidderId,
    amount: Amount,
    message: Option<BidMessage>,
    status: BidStatus,
    idempotency_key: Option<IdempotencyKey>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBidData {
    /// Persisted bid identifier.
    pub id: BidId,
    /// Persisted parent task.
    pub task_id: TaskId,
    /// Persisted bidder.
    pub bidder_id: BidderId,
    /// Persisted offer.
    pub amount: Amount,
    /// Persisted note.
    pub message: Option<BidMessage>,
    /// Persisted decision status.
    pub status: BidStatus,
    /// Persisted deduplication token.
    pub idempotency_key: Option<IdempotencyKey>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// Creates a pending bid from a validated submission.
    #[must_use]
    pub fn submit(submission: BidSubmission, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: BidId::new(),
            task_id: submission.task_id,
            bidder_id: submission.bidder_id,
            amount: submission.amount,
            message: submission.message,
            status: BidStatus::Pending,
            idempotency_key: submission.idempotency_key,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a bid from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedBidData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            bidder_id: data.bidder_id,
            amount: data.amount,
            message: data.message,
            status: data.status,
            idempotency_key: data.idempotency_key,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Decomposes the bid into its persisted representation.
    #[must_use]
    pub fn into_persisted(self) -> PersistedBidData {
        PersistedBidData {
            id: self.id,
            task_id: self.task_id,
            bidder_id: self.bidder_id,
            amount: self.amount,
            message: self.message,
            status: self.status,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns the bid identifier.
    #[must_use]
    pub const fn id(&self) -> BidId {
        self.id
    }

    /// Returns the parent task identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the bidder identifier.
    #[must_use]
    pub const fn bidder_id(&self) -> &BidderId {
        &self.bidder_id
    }

    /// Returns the offered amount.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Returns the bidder's note, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&BidMessage> {
        self.message.as_ref()
    }

    /// Returns the decision status.
    #[must_use]
    pub const fn status(&self) -> BidStatus {
        self.status
    }

    /// Returns the deduplication token, if any.
    #[must_use]
    pub const fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        self.idempotency_key.as_ref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Fails unless the bid is still awaiting a decision.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleViolation::BidNotPending`] for accepted or rejected
    /// bids.
    pub const fn ensure_pending(&self) -> Result<(), LifecycleViolation> {
        if self.status.is_terminal() {
            return Err(LifecycleViolation::BidNotPending {
                bid_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
