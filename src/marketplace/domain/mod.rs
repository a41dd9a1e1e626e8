//! Domain model for the task/bid marketplace.
//!
//! Tasks and bids are plain values here. Cross-entity invariants (one
//! accepted bid per task, the bid counter, cascade deletion) are enforced by
//! the bid workflow service inside storage transactions, never by the domain
//! types alone.

mod bid;
mod error;
mod ids;
mod task;
mod values;

pub use bid::{Bid, BidStatus, BidSubmission, PersistedBidData};
pub use error::{LifecycleViolation, ParseBidStatusError, ParseTaskStatusError, ValidationError};
pub use ids::{BidId, BidderId, ClientId, IdempotencyKey, TaskId};
pub use task::{PersistedTaskData, Task, TaskDetails, TaskRevision, TaskStatus};
pub use values::{Amount, BidMessage, TaskDescription, TaskTitle};
