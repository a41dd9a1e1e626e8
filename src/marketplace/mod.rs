//! Task and bid marketplace.
//!
//! Clients post tasks, bidders place bids, and a client accepts exactly one
//! bid per task. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//!
//! Every operation that touches both tasks and bids (submitting, accepting,
//! deleting) goes through [`services::BidWorkflow`], which runs it inside a
//! single storage transaction.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
