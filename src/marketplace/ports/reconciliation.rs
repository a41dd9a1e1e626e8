//! Integrity audit port used by the reconciliation sweep.

use super::StoreResult;
use crate::marketplace::domain::{BidId, BidderId, TaskId, TaskStatus};
use async_trait::async_trait;
use serde::Serialize;

/// Task whose status or assignee disagrees with its accepted bids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentAnomaly {
    /// Affected task.
    pub task_id: TaskId,
    /// Stored task status.
    pub status: TaskStatus,
    /// Stored assignee.
    pub assigned_bidder: Option<BidderId>,
    /// Number of accepted bids found for the task.
    pub accepted_bids: u64,
    /// Bidder of the accepted bid when exactly one exists.
    pub accepted_bidder: Option<BidderId>,
}

impl AssignmentAnomaly {
    /// Returns `true` when the stored assignment satisfies the invariant:
    /// assigned exactly when one bid is accepted, to that bid's bidder.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.status {
            TaskStatus::Assigned => {
                self.accepted_bids == 1
                    && self.assigned_bidder.is_some()
                    && self.assigned_bidder == self.accepted_bidder
            }
            TaskStatus::Open | TaskStatus::Cancelled => self.accepted_bids == 0,
        }
    }
}

/// Task whose stored bid counter differs from its actual bid records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BidCountDrift {
    /// Affected task.
    pub task_id: TaskId,
    /// Stored counter value.
    pub recorded: u64,
    /// Number of bid records referencing the task.
    pub actual: u64,
}

/// Cross-collection integrity queries.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Returns bids whose task no longer exists.
    async fn orphaned_bid_ids(&self) -> StoreResult<Vec<BidId>>;

    /// Deletes the given bids if they are still orphaned, returning the
    /// number removed.
    async fn delete_orphaned_bids(&self, ids: &[BidId]) -> StoreResult<u64>;

    /// Returns tasks whose status or assignee disagrees with their accepted
    /// bids.
    async fn assignment_anomalies(&self) -> StoreResult<Vec<AssignmentAnomaly>>;

    /// Returns tasks whose bid counter differs from their bid records.
    async fn bid_count_drift(&self) -> StoreResult<Vec<BidCountDrift>>;
}
