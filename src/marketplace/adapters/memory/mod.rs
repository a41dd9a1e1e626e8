//! In-memory marketplace store for tests and single-process deployments.
//!
//! Transactions hold the write lock and journal each record before changing
//! it; a failed transaction replays the journal, so it leaves no partial
//! writes behind.

mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::marketplace::{
    domain::{Bid, BidId, BidStatus, BidderId, Task, TaskDetails, TaskId, TaskStatus},
    ports::{
        AssignmentAnomaly, BidCountDrift, BidStore, ReconciliationStore, StoreError, StoreResult,
        TaskFilter, TaskStore, TransactionRunner, TransactionScope, WriteOutcome,
    },
};
use state::{MarketState, MemoryScope};

/// Thread-safe in-memory task and bid store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMarketplaceStore {
    state: Arc<RwLock<MarketState>>,
}

impl InMemoryMarketplaceStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MarketState>> {
        self.state
            .read()
            .map_err(|err| StoreError::unavailable(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MarketState>> {
        self.state
            .write()
            .map_err(|err| StoreError::unavailable(std::io::Error::other(err.to_string())))
    }

    /// Stores a bid without any task or counter checks, mimicking rows left
    /// behind by a storage engine without referential integrity.
    #[cfg(test)]
    pub(crate) fn insert_raw_bid(&self, bid: Bid) -> StoreResult<()> {
        self.write()?.bids.insert(bid.id(), bid);
        Ok(())
    }

    /// Replaces a task record verbatim, bypassing lifecycle guards.
    #[cfg(test)]
    pub(crate) fn overwrite_task(&self, task: Task) -> StoreResult<()> {
        self.write()?.tasks.insert(task.id(), task);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryMarketplaceStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    async fn update_task_details(
        &self,
        id: TaskId,
        details: &TaskDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        let mut state = self.write()?;
        if !state.tasks.get(&id).is_some_and(Task::is_open) {
            return Ok(WriteOutcome::Unmatched);
        }
        state.edit_task(id, |data| {
            data.details = details.clone();
            data.updated_at = updated_at;
        });
        Ok(WriteOutcome::Applied)
    }

    async fn cancel_task_if_open(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        let mut state = self.write()?;
        if !state.tasks.get(&id).is_some_and(Task::is_open) {
            return Ok(WriteOutcome::Unmatched);
        }
        state.edit_task(id, |data| {
            data.status = TaskStatus::Cancelled;
            data.updated_at = updated_at;
        });
        Ok(WriteOutcome::Applied)
    }
}

#[async_trait]
impl BidStore for InMemoryMarketplaceStore {
    async fn find_bid(&self, id: BidId) -> StoreResult<Option<Bid>> {
        Ok(self.read()?.bids.get(&id).cloned())
    }

    async fn bids_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Bid>> {
        Ok(self.read()?.bids_where(|bid| bid.task_id() == task_id))
    }

    async fn bids_for_bidder(&self, bidder_id: &BidderId) -> StoreResult<Vec<Bid>> {
        Ok(self.read()?.bids_where(|bid| bid.bidder_id() == bidder_id))
    }
}

#[async_trait]
impl TransactionRunner for InMemoryMarketplaceStore {
    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TransactionScope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let mut live = self.write().map_err(E::from)?;
        let mut scope = MemoryScope::new(&mut *live);
        match work(&mut scope) {
            Ok(output) => Ok(output),
            Err(err) => {
                scope.roll_back();
                Err(err)
            }
        }
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryMarketplaceStore {
    async fn orphaned_bid_ids(&self) -> StoreResult<Vec<BidId>> {
        let state = self.read()?;
        Ok(state
            .bids_where(|bid| !state.tasks.contains_key(&bid.task_id()))
            .iter()
            .map(Bid::id)
            .collect())
    }

    async fn delete_orphaned_bids(&self, ids: &[BidId]) -> StoreResult<u64> {
        let targets: HashSet<BidId> = ids.iter().copied().collect();
        let mut state = self.write()?;
        let MarketState { tasks, bids } = &mut *state;
        let before = bids.len();
        bids.retain(|id, bid| !targets.contains(id) || tasks.contains_key(&bid.task_id()));
        Ok(u64::try_from(before.saturating_sub(bids.len())).unwrap_or(u64::MAX))
    }

    async fn assignment_anomalies(&self) -> StoreResult<Vec<AssignmentAnomaly>> {
        let state = self.read()?;
        let mut tasks: Vec<&Task> = state.tasks.values().collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks
            .into_iter()
            .map(|task| {
                let accepted = state.bids_where(|bid| {
                    bid.task_id() == task.id() && bid.status() == BidStatus::Accepted
                });
                let accepted_bidder = match accepted.as_slice() {
                    [only] => Some(only.bidder_id().clone()),
                    _ => None,
                };
                AssignmentAnomaly {
                    task_id: task.id(),
                    status: task.status(),
                    assigned_bidder: task.assigned_bidder().cloned(),
                    accepted_bids: u64::try_from(accepted.len()).unwrap_or(u64::MAX),
                    accepted_bidder,
                }
            })
            .filter(|candidate| !candidate.is_consistent())
            .collect())
    }

    async fn bid_count_drift(&self) -> StoreResult<Vec<BidCountDrift>> {
        let state = self.read()?;
        let mut tasks: Vec<&Task> = state.tasks.values().collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks
            .into_iter()
            .filter_map(|task| {
                let actual = state.bid_count(task.id());
                (actual != task.bids_count()).then_some(BidCountDrift {
                    task_id: task.id(),
                    recorded: task.bids_count(),
                    actual,
                })
            })
            .collect())
    }
}
