//! Store port for plain bid reads.

use super::StoreResult;
use crate::marketplace::domain::{Bid, BidId, BidderId, TaskId};
use async_trait::async_trait;

/// Read-only bid lookups outside any transaction.
///
/// Bids are created, decided, and deleted only through
/// [`super::TransactionScope`].
#[async_trait]
pub trait BidStore: Send + Sync {
    /// Finds a bid by identifier.
    async fn find_bid(&self, id: BidId) -> StoreResult<Option<Bid>>;

    /// Returns every bid on a task, oldest first.
    async fn bids_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Bid>>;

    /// Returns every bid placed by a bidder, oldest first.
    async fn bids_for_bidder(&self, bidder_id: &BidderId) -> StoreResult<Vec<Bid>>;
}
