//! Transactional bid workflow: submission, acceptance, and task deletion.
//!
//! Each cross-entity operation validates its input first and then runs its
//! entire read-check-write sequence inside one storage transaction. Any
//! guard that fails inside the transaction returns an error, which discards
//! every write made so far.

use super::error::{MarketplaceError, MarketplaceResult};
use crate::marketplace::{
    domain::{
        Amount, Bid, BidId, BidMessage, BidSubmission, BidderId, IdempotencyKey,
        LifecycleViolation, TaskId,
    },
    ports::{MarketplaceStore, TransactionScope},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Request payload for placing a bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitBidRequest {
    task_id: TaskId,
    bidder_id: String,
    amount: u64,
    message: Option<String>,
    idempotency_key: Option<String>,
}

impl SubmitBidRequest {
    /// Creates a request with the required bid fields.
    #[must_use]
    pub fn new(task_id: TaskId, bidder_id: impl Into<String>, amount: u64) -> Self {
        Self {
            task_id,
            bidder_id: bidder_id.into(),
            amount,
            message: None,
            idempotency_key: None,
        }
    }

    /// Attaches a note to the client.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the token used to deduplicate retries of this submission.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Returns the targeted task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn into_submission(self) -> MarketplaceResult<BidSubmission> {
        Ok(BidSubmission {
            task_id: self.task_id,
            bidder_id: BidderId::new(self.bidder_id)?,
            amount: Amount::new(self.amount)?,
            message: self.message.map(BidMessage::parse).transpose()?.flatten(),
            idempotency_key: self.idempotency_key.map(IdempotencyKey::new).transpose()?,
        })
    }
}

/// Result of a bid submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new bid was stored and counted.
    Created(BidId),
    /// An earlier bid with the same idempotency key was found; nothing was
    /// written.
    Replayed(BidId),
}

impl SubmitOutcome {
    /// Returns the identifier of the stored bid.
    #[must_use]
    pub const fn bid_id(self) -> BidId {
        match self {
            Self::Created(id) | Self::Replayed(id) => id,
        }
    }

    /// Returns `true` when the submission matched an earlier one.
    #[must_use]
    pub const fn is_replay(self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// Acknowledgement of a committed bid acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acceptance {
    /// The winning bid.
    pub bid_id: BidId,
    /// The task now assigned.
    pub task_id: TaskId,
    /// The bidder the task is assigned to.
    pub assigned_bidder: BidderId,
    /// Number of sibling bids moved from pending to rejected.
    pub rejected_bids: u64,
}

/// Summary of a committed task deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskDeletion {
    /// The deleted task.
    pub task_id: TaskId,
    /// Number of bids removed with it.
    pub removed_bids: u64,
}

/// Orchestrates every operation that must keep tasks and bids consistent.
#[derive(Clone)]
pub struct BidWorkflow<S, C>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> BidWorkflow<S, C>
where
    S: MarketplaceStore,
    C: Clock + Send + Sync,
{
    /// Creates a workflow over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Places a pending bid and counts it against its task, atomically.
    ///
    /// When the request carries an idempotency key already used by the same
    /// bidder on the same task, the earlier bid is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Validation`] for malformed input,
    /// [`MarketplaceError::TaskNotFound`] for an unknown task,
    /// [`MarketplaceError::TaskNotOpen`] when the task no longer accepts
    /// bids, or [`MarketplaceError::Storage`] when the transaction fails.
    #[instrument(skip_all, fields(task_id = %request.task_id()))]
    pub async fn submit_bid(&self, request: SubmitBidRequest) -> MarketplaceResult<SubmitOutcome> {
        let submission = request.into_submission()?;
        let bid = Bid::submit(submission, &*self.clock);
        let outcome = self
            .store
            .run_in_transaction(move |scope| submit_in_scope(scope, &bid))
            .await
            .inspect_err(|err| debug!(error = %err, "bid submission rejected"))?;
        match outcome {
            SubmitOutcome::Created(bid_id) => debug!(%bid_id, "bid submitted"),
            SubmitOutcome::Replayed(bid_id) => debug!(%bid_id, "bid submission replayed"),
        }
        Ok(outcome)
    }

    /// Accepts a pending bid, rejects its pending siblings, and assigns the
    /// task to the winning bidder, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::BidNotFound`] for an unknown bid,
    /// [`MarketplaceError::Conflict`] when the bid is not pending or its task
    /// is not open, or [`MarketplaceError::Storage`] when the transaction
    /// fails.
    #[instrument(skip(self))]
    pub async fn accept_bid(&self, bid_id: BidId) -> MarketplaceResult<Acceptance> {
        let now = self.clock.utc();
        let acceptance = self
            .store
            .run_in_transaction(move |scope| accept_in_scope(scope, bid_id, now))
            .await
            .inspect_err(|err| debug!(error = %err, "bid acceptance rejected"))?;
        info!(
            task_id = %acceptance.task_id,
            bidder_id = %acceptance.assigned_bidder,
            rejected_bids = acceptance.rejected_bids,
            "bid accepted"
        );
        Ok(acceptance)
    }

    /// Deletes a task together with every bid placed on it, atomically.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::TaskNotFound`] for an unknown task or
    /// [`MarketplaceError::Storage`] when the transaction fails.
    #[instrument(skip(self))]
    pub async fn delete_task(&self, task_id: TaskId) -> MarketplaceResult<TaskDeletion> {
        let deletion = self
            .store
            .run_in_transaction(move |scope| delete_in_scope(scope, task_id))
            .await?;
        info!(removed_bids = deletion.removed_bids, "task deleted");
        Ok(deletion)
    }

    /// Retrieves a bid.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::BidNotFound`] for an unknown bid or
    /// [`MarketplaceError::Storage`] when the lookup fails.
    pub async fn get_bid(&self, bid_id: BidId) -> MarketplaceResult<Bid> {
        self.store
            .find_bid(bid_id)
            .await?
            .ok_or(MarketplaceError::BidNotFound(bid_id))
    }

    /// Lists the bids on a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::TaskNotFound`] for an unknown task or
    /// [`MarketplaceError::Storage`] when the lookup fails.
    pub async fn bids_for_task(&self, task_id: TaskId) -> MarketplaceResult<Vec<Bid>> {
        if self.store.find_task(task_id).await?.is_none() {
            return Err(MarketplaceError::TaskNotFound(task_id));
        }
        Ok(self.store.bids_for_task(task_id).await?)
    }

    /// Lists the bids a bidder has placed, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MarketplaceError::Validation`] for a malformed bidder
    /// identifier or [`MarketplaceError::Storage`] when the lookup fails.
    pub async fn bids_for_bidder(&self, bidder_id: &str) -> MarketplaceResult<Vec<Bid>> {
        let bidder = BidderId::new(bidder_id)?;
        Ok(self.store.bids_for_bidder(&bidder).await?)
    }
}

fn submit_in_scope(
    scope: &mut dyn TransactionScope,
    bid: &Bid,
) -> MarketplaceResult<SubmitOutcome> {
    let task_id = bid.task_id();
    let task = scope
        .task_for_update(task_id)?
        .ok_or(MarketplaceError::TaskNotFound(task_id))?;

    let earlier = match bid.idempotency_key() {
        Some(key) => scope.bid_by_idempotency_key(task_id, bid.bidder_id(), key)?,
        None => None,
    };
    if let Some(existing) = earlier {
        return Ok(SubmitOutcome::Replayed(existing.id()));
    }

    if !task.is_open() {
        return Err(MarketplaceError::TaskNotOpen {
            task_id,
            status: task.status(),
        });
    }

    scope.insert_bid(bid)?;
    scope
        .increment_bids_count(task_id, bid.created_at())?
        .require(|| MarketplaceError::TaskNotFound(task_id))?;
    Ok(SubmitOutcome::Created(bid.id()))
}

fn accept_in_scope(
    scope: &mut dyn TransactionScope,
    bid_id: BidId,
    now: DateTime<Utc>,
) -> MarketplaceResult<Acceptance> {
    let task_id = scope
        .bid(bid_id)?
        .ok_or(MarketplaceError::BidNotFound(bid_id))?
        .task_id();
    let task = scope
        .task_for_update(task_id)?
        .ok_or(MarketplaceError::TaskNotFound(task_id))?;
    // Re-read under the task lock: a racing acceptance may have settled it.
    let bid = scope
        .bid(bid_id)?
        .ok_or(MarketplaceError::BidNotFound(bid_id))?;
    bid.ensure_pending()?;
    task.ensure_open()?;

    scope.accept_pending_bid(bid_id, now)?.require(|| {
        LifecycleViolation::BidNotPending {
            bid_id,
            status: bid.status(),
        }
    })?;
    let rejected_bids = scope.reject_pending_siblings(task_id, bid_id, now)?;
    scope
        .assign_open_task(task_id, bid.bidder_id(), now)?
        .require(|| LifecycleViolation::TaskNotOpen {
            task_id,
            status: task.status(),
        })?;

    Ok(Acceptance {
        bid_id,
        task_id,
        assigned_bidder: bid.bidder_id().clone(),
        rejected_bids,
    })
}

fn delete_in_scope(
    scope: &mut dyn TransactionScope,
    task_id: TaskId,
) -> MarketplaceResult<TaskDeletion> {
    if scope.task_for_update(task_id)?.is_none() {
        return Err(MarketplaceError::TaskNotFound(task_id));
    }
    let removed_bids = scope.delete_bids_for_task(task_id)?;
    scope
        .delete_task(task_id)?
        .require(|| MarketplaceError::TaskNotFound(task_id))?;
    Ok(TaskDeletion {
        task_id,
        removed_bids,
    })
}
