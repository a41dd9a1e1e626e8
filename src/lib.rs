//! `SkillNest`: the bidding core of a task marketplace.
//!
//! Clients post tasks, bidders place bids on open tasks, and a client
//! accepts exactly one bid, which assigns the task and rejects the other
//! pending bids. Every multi-record change commits atomically.
//!
//! # Architecture
//!
//! `SkillNest` follows hexagonal architecture principles:
//!
//! - **Domain**: validated values and lifecycle rules with no infrastructure
//! - **Ports**: store traits and the transactional unit-of-work seam
//! - **Adapters**: in-memory and `PostgreSQL` implementations of the ports
//! - **Services**: the bid workflow, task catalog, and reconciliation sweep
//!
//! # Modules
//!
//! - [`marketplace`]: tasks, bids, and the workflows over them
//! - [`http`]: JSON routes over the services
//! - [`config`]: layered runtime settings
//! - [`telemetry`]: tracing subscriber set-up

pub mod config;
pub mod http;
pub mod marketplace;
pub mod telemetry;
