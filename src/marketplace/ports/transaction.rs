//! Transaction port for atomic multi-record task and bid changes.
//!
//! A [`TransactionRunner`] opens a scope, hands it to synchronous work, and
//! commits only when that work returns `Ok`. Any error, early return, or
//! storage abort discards every write made through the scope.

use super::{StoreError, StoreResult, WriteOutcome};
use crate::marketplace::domain::{Bid, BidId, BidderId, IdempotencyKey, Task, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Reads and writes visible only inside one open transaction.
///
/// Conditional writes report [`WriteOutcome::Unmatched`] instead of failing,
/// so the caller maps a missed guard onto its own error taxonomy.
pub trait TransactionScope {
    /// Reads a task, locking it against concurrent writers until commit.
    ///
    /// Reads made after this call observe everything committed before the
    /// lock was granted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the read fails.
    fn task_for_update(&mut self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Reads a bid.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the read fails.
    fn bid(&mut self, id: BidId) -> StoreResult<Option<Bid>>;

    /// Finds an earlier submission by the same bidder with the same token.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the read fails.
    fn bid_by_idempotency_key(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Bid>>;

    /// Inserts a new bid.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateBid`] when the identifier exists.
    fn insert_bid(&mut self, bid: &Bid) -> StoreResult<()>;

    /// Adds one to the bid counter of a task.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn increment_bids_count(
        &mut self,
        task_id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome>;

    /// Marks a pending bid accepted; other statuses are left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn accept_pending_bid(
        &mut self,
        bid_id: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome>;

    /// Rejects every pending bid of a task except `winner`, returning the
    /// number of bids rejected.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn reject_pending_siblings(
        &mut self,
        task_id: TaskId,
        winner: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    /// Assigns an open task to a bidder; other statuses are left untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn assign_open_task(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome>;

    /// Deletes every bid of a task, returning the number deleted.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn delete_bids_for_task(&mut self, task_id: TaskId) -> StoreResult<u64>;

    /// Deletes a task record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the write fails.
    fn delete_task(&mut self, task_id: TaskId) -> StoreResult<WriteOutcome>;
}

/// Opens transactions over the task and bid collections.
#[async_trait]
pub trait TransactionRunner: Send + Sync {
    /// Runs `work` inside a single atomic transaction.
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back
    /// otherwise. Acquisition timeouts and commit-time aborts surface as
    /// transient [`StoreError`]s converted into `E`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`, or a converted [`StoreError`]
    /// when the transaction cannot be opened or committed.
    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TransactionScope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static;
}
