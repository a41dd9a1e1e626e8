//! Application services for the task and bid marketplace.

mod catalog;
mod error;
mod reconciliation;
mod workflow;

pub use catalog::{CreateTaskRequest, TaskCatalogService, TaskQuery, UpdateTaskRequest};
pub use error::{ErrorKind, MarketplaceError, MarketplaceResult};
pub use reconciliation::{ReconciliationService, SweepReport};
pub use workflow::{Acceptance, BidWorkflow, SubmitBidRequest, SubmitOutcome, TaskDeletion};
