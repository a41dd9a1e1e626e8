//! Unit tests for the marketplace module.
//!
//! Tests are organised by concern: domain value rules, the transactional bid
//! workflow, the task catalog, store transactions, and reconciliation.

mod support;
mod transaction_tests;
