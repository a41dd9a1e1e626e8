//! Store state and the journaling transaction scope for the in-memory store.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::marketplace::{
    domain::{
        Bid, BidId, BidStatus, BidderId, IdempotencyKey, PersistedBidData, PersistedTaskData, Task,
        TaskId, TaskStatus,
    },
    ports::{StoreError, StoreResult, TransactionScope, WriteOutcome},
};

/// Every task and bid held by the store.
#[derive(Debug, Default)]
pub(super) struct MarketState {
    pub(super) tasks: HashMap<TaskId, Task>,
    pub(super) bids: HashMap<BidId, Bid>,
}

impl MarketState {
    /// Rebuilds a task through its persisted form, applying `edit`.
    pub(super) fn edit_task(&mut self, id: TaskId, edit: impl FnOnce(&mut PersistedTaskData)) {
        if let Some(task) = self.tasks.remove(&id) {
            let mut data = task.into_persisted();
            edit(&mut data);
            self.tasks.insert(id, Task::from_persisted(data));
        }
    }

    /// Rebuilds a bid through its persisted form, applying `edit`.
    pub(super) fn edit_bid(&mut self, id: BidId, edit: impl FnOnce(&mut PersistedBidData)) {
        if let Some(bid) = self.bids.remove(&id) {
            let mut data = bid.into_persisted();
            edit(&mut data);
            self.bids.insert(id, Bid::from_persisted(data));
        }
    }

    /// Returns bids satisfying `predicate`, oldest first.
    pub(super) fn bids_where(&self, predicate: impl Fn(&Bid) -> bool) -> Vec<Bid> {
        let mut bids: Vec<Bid> = self
            .bids
            .values()
            .filter(|bid| predicate(bid))
            .cloned()
            .collect();
        bids.sort_by_key(|bid| (bid.created_at(), bid.id()));
        bids
    }

    /// Returns the number of bids referencing a task.
    pub(super) fn bid_count(&self, task_id: TaskId) -> u64 {
        let count = self
            .bids
            .values()
            .filter(|bid| bid.task_id() == task_id)
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    fn task_status(&self, id: TaskId) -> Option<TaskStatus> {
        self.tasks.get(&id).map(Task::status)
    }
}

fn to_u64(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Prior value of one record touched inside a transaction.
enum Undo {
    Task(TaskId, Option<Task>),
    Bid(BidId, Option<Bid>),
}

/// Transaction scope writing to the live state under the write lock.
///
/// Each record is journaled before its first change in the scope, so
/// rolling back costs time proportional to the records touched.
pub(super) struct MemoryScope<'state> {
    state: &'state mut MarketState,
    journal: Vec<Undo>,
}

impl<'state> MemoryScope<'state> {
    pub(super) const fn new(state: &'state mut MarketState) -> Self {
        Self {
            state,
            journal: Vec::new(),
        }
    }

    /// Restores every journaled record, newest change first.
    pub(super) fn roll_back(self) {
        let Self { state, journal } = self;
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Task(id, Some(task)) => {
                    state.tasks.insert(id, task);
                }
                Undo::Task(id, None) => {
                    state.tasks.remove(&id);
                }
                Undo::Bid(id, Some(bid)) => {
                    state.bids.insert(id, bid);
                }
                Undo::Bid(id, None) => {
                    state.bids.remove(&id);
                }
            }
        }
    }

    fn remember_task(&mut self, id: TaskId) {
        let prior = self.state.tasks.get(&id).cloned();
        self.journal.push(Undo::Task(id, prior));
    }

    fn remember_bid(&mut self, id: BidId) {
        let prior = self.state.bids.get(&id).cloned();
        self.journal.push(Undo::Bid(id, prior));
    }
}

impl TransactionScope for MemoryScope<'_> {
    fn task_for_update(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    fn bid(&mut self, id: BidId) -> StoreResult<Option<Bid>> {
        Ok(self.state.bids.get(&id).cloned())
    }

    fn bid_by_idempotency_key(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Bid>> {
        Ok(self
            .state
            .bids
            .values()
            .find(|bid| {
                bid.task_id() == task_id
                    && bid.bidder_id() == bidder_id
                    && bid.idempotency_key() == Some(key)
            })
            .cloned())
    }

    fn insert_bid(&mut self, bid: &Bid) -> StoreResult<()> {
        if self.state.bids.contains_key(&bid.id()) {
            return Err(StoreError::DuplicateBid(bid.id()));
        }
        self.remember_bid(bid.id());
        self.state.bids.insert(bid.id(), bid.clone());
        Ok(())
    }

    fn increment_bids_count(
        &mut self,
        task_id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        if !self.state.tasks.contains_key(&task_id) {
            return Ok(WriteOutcome::Unmatched);
        }
        self.remember_task(task_id);
        self.state.edit_task(task_id, |data| {
            data.bids_count = data.bids_count.saturating_add(1);
            data.updated_at = updated_at;
        });
        Ok(WriteOutcome::Applied)
    }

    fn accept_pending_bid(
        &mut self,
        bid_id: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        let is_pending = self
            .state
            .bids
            .get(&bid_id)
            .is_some_and(|bid| bid.status() == BidStatus::Pending);
        if !is_pending {
            return Ok(WriteOutcome::Unmatched);
        }
        self.remember_bid(bid_id);
        self.state.edit_bid(bid_id, |data| {
            data.status = BidStatus::Accepted;
            data.updated_at = updated_at;
        });
        Ok(WriteOutcome::Applied)
    }

    fn reject_pending_siblings(
        &mut self,
        task_id: TaskId,
        winner: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let losers: Vec<BidId> = self
            .state
            .bids
            .values()
            .filter(|bid| {
                bid.task_id() == task_id && bid.id() != winner && bid.status() == BidStatus::Pending
            })
            .map(Bid::id)
            .collect();
        for bid_id in &losers {
            self.remember_bid(*bid_id);
            self.state.edit_bid(*bid_id, |data| {
                data.status = BidStatus::Rejected;
                data.updated_at = updated_at;
            });
        }
        Ok(to_u64(losers.len()))
    }

    fn assign_open_task(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        if self.state.task_status(task_id) != Some(TaskStatus::Open) {
            return Ok(WriteOutcome::Unmatched);
        }
        self.remember_task(task_id);
        self.state.edit_task(task_id, |data| {
            data.status = TaskStatus::Assigned;
            data.assigned_bidder = Some(bidder_id.clone());
            data.updated_at = updated_at;
        });
        Ok(WriteOutcome::Applied)
    }

    fn delete_bids_for_task(&mut self, task_id: TaskId) -> StoreResult<u64> {
        let doomed: Vec<BidId> = self
            .state
            .bids
            .values()
            .filter(|bid| bid.task_id() == task_id)
            .map(Bid::id)
            .collect();
        for bid_id in &doomed {
            self.remember_bid(*bid_id);
            self.state.bids.remove(bid_id);
        }
        Ok(to_u64(doomed.len()))
    }

    fn delete_task(&mut self, task_id: TaskId) -> StoreResult<WriteOutcome> {
        if !self.state.tasks.contains_key(&task_id) {
            return Ok(WriteOutcome::Unmatched);
        }
        self.remember_task(task_id);
        self.state.tasks.remove(&task_id);
        Ok(WriteOutcome::Applied)
    }
}
