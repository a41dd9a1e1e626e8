//! `PostgreSQL` adapter for marketplace persistence.

mod errors;
mod models;
mod schema;
mod scope;
mod store;

pub use store::{MIGRATIONS, MarketplacePgPool, PostgresMarketplaceStore};
