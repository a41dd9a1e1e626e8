//! Port definitions for marketplace persistence.

mod bid_store;
mod error;
mod reconciliation;
mod task_store;
mod transaction;

pub use bid_store::BidStore;
pub use error::{StoreError, StoreResult, WriteOutcome};
pub use reconciliation::{AssignmentAnomaly, BidCountDrift, ReconciliationStore};
#[cfg(test)]
pub use task_store::MockTaskStore;
pub use task_store::{TaskFilter, TaskStore};
pub use transaction::{TransactionRunner, TransactionScope};

/// Every port a complete marketplace storage backend provides.
pub trait MarketplaceStore:
    TaskStore + BidStore + TransactionRunner + ReconciliationStore + 'static
{
}

impl<T> MarketplaceStore for T where
    T: TaskStore + BidStore + TransactionRunner + ReconciliationStore + 'static
{
}
