//! Shared helpers for `PostgreSQL` integration tests.
//!
//! Every test gets its own schema, selected through `search_path` on each
//! pooled connection, so tests run in parallel against one database.

use std::sync::Arc;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use mockable::DefaultClock;
use skillnest::marketplace::{
    adapters::postgres::PostgresMarketplaceStore,
    domain::TaskId,
    services::{BidWorkflow, CreateTaskRequest, ReconciliationService, TaskCatalogService},
};
use uuid::Uuid;

/// Variable naming the database the tests run against.
pub const DATABASE_URL_VAR: &str = "SKILLNEST_TEST_DATABASE_URL";

#[derive(Debug)]
struct SearchPath(String);

impl CustomizeConnection<PgConnection, diesel::r2d2::Error> for SearchPath {
    fn on_acquire(&self, conn: &mut PgConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!("SET search_path TO {}", self.0))
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Services over a store confined to a throwaway schema.
pub struct PgMarketplace {
    /// Shared store.
    pub store: Arc<PostgresMarketplaceStore>,
    /// Bid workflow over the store.
    pub workflow: BidWorkflow<PostgresMarketplaceStore, DefaultClock>,
    /// Task catalog over the store.
    pub catalog: TaskCatalogService<PostgresMarketplaceStore, DefaultClock>,
    /// Reconciliation sweep over the store.
    pub sweeper: ReconciliationService<PostgresMarketplaceStore>,
    database_url: String,
    schema: String,
}

impl PgMarketplace {
    /// Runs raw SQL inside this test's schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained or the SQL fails.
    pub fn execute(&self, sql: &str) -> eyre::Result<()> {
        let mut conn = self.store.pool().get()?;
        conn.batch_execute(sql)?;
        Ok(())
    }

    /// Posts an open task for `client-1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be created.
    pub async fn post_task(&self, title: &str) -> eyre::Result<TaskId> {
        let task = self
            .catalog
            .create_task(CreateTaskRequest::new("client-1", title).with_budget(1_000))
            .await?;
        Ok(task.id())
    }
}

impl Drop for PgMarketplace {
    fn drop(&mut self) {
        if let Ok(mut conn) = PgConnection::establish(&self.database_url) {
            let _dropped = conn.batch_execute(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema));
        }
    }
}

/// Builds services over a fresh, migrated schema, or `None` when no test
/// database is configured.
///
/// # Errors
///
/// Returns an error if the schema cannot be created or migrated.
pub async fn pg_marketplace() -> eyre::Result<Option<PgMarketplace>> {
    let Ok(database_url) = std::env::var(DATABASE_URL_VAR) else {
        return Ok(None);
    };
    let schema = format!("skillnest_test_{}", Uuid::new_v4().simple());

    let url = database_url.clone();
    let schema_name = schema.clone();
    let pool = tokio::task::spawn_blocking(move || -> eyre::Result<_> {
        let mut admin = PgConnection::establish(&url)?;
        admin.batch_execute(&format!("CREATE SCHEMA {schema_name}"))?;
        let pool = Pool::builder()
            .max_size(8)
            .connection_timeout(Duration::from_secs(10))
            .connection_customizer(Box::new(SearchPath(schema_name)))
            .build(ConnectionManager::<PgConnection>::new(url))?;
        Ok(pool)
    })
    .await??;

    let store = Arc::new(PostgresMarketplaceStore::new(pool));
    let clock = Arc::new(DefaultClock);
    let marketplace = PgMarketplace {
        workflow: BidWorkflow::new(Arc::clone(&store), Arc::clone(&clock)),
        catalog: TaskCatalogService::new(Arc::clone(&store), clock),
        sweeper: ReconciliationService::new(Arc::clone(&store)),
        store,
        database_url,
        schema,
    };
    marketplace.store.run_migrations().await?;
    Ok(Some(marketplace))
}
