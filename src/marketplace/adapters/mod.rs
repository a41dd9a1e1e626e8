//! Storage adapters for the marketplace ports.

pub mod memory;
pub mod postgres;
