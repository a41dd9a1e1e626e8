//! `PostgreSQL` store implementation for marketplace persistence.

use super::{
    errors::{affected, classify, is_primary_key_violation},
    models::{AssignmentAuditRow, BidCountRow, BidRow, NewTaskRow, TaskRow, amount_to_column},
    schema::{bids, tasks},
    scope::PgScope,
};
use crate::marketplace::{
    domain::{Bid, BidId, BidderId, Task, TaskDetails, TaskId, TaskStatus},
    ports::{
        AssignmentAnomaly, BidCountDrift, BidStore, ReconciliationStore, StoreError, StoreResult,
        TaskFilter, TaskStore, TransactionRunner, TransactionScope, WriteOutcome,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{exists, not};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::sync::Arc;
use std::time::Duration;

/// `PostgreSQL` connection pool type used by the marketplace store.
pub type MarketplacePgPool = Pool<ConnectionManager<PgConnection>>;

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const ASSIGNMENT_AUDIT_SQL: &str = concat!(
    "SELECT t.id AS task_id, t.status, t.assigned_bidder, ",
    "COUNT(b.id) AS accepted_bids, ",
    "CASE WHEN COUNT(b.id) = 1 THEN MIN(b.bidder_id) END AS accepted_bidder ",
    "FROM tasks t ",
    "LEFT JOIN bids b ON b.task_id = t.id AND b.status = 'accepted' ",
    "GROUP BY t.id ",
    "ORDER BY t.created_at, t.id",
);

const BID_COUNT_DRIFT_SQL: &str = concat!(
    "SELECT t.id AS task_id, t.bids_count AS recorded, COUNT(b.id) AS actual ",
    "FROM tasks t ",
    "LEFT JOIN bids b ON b.task_id = t.id ",
    "GROUP BY t.id ",
    "HAVING t.bids_count <> COUNT(b.id) ",
    "ORDER BY t.created_at, t.id",
);

/// Failure inside a transaction body.
enum ScopeFailure<E> {
    Work(E),
    Database(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for ScopeFailure<E> {
    fn from(err: diesel::result::Error) -> Self {
        Self::Database(err)
    }
}

/// `PostgreSQL`-backed task and bid store.
///
/// Every call runs on the blocking thread pool via
/// [`tokio::task::spawn_blocking`]. Transactions run at `READ COMMITTED`
/// and lock the parent task row first, so concurrent workflows on the same
/// task queue on that lock and each re-reads what its predecessor committed.
#[derive(Debug, Clone)]
pub struct PostgresMarketplaceStore {
    pool: MarketplacePgPool,
}

impl PostgresMarketplaceStore {
    /// Creates a store from an existing connection pool.
    #[must_use]
    pub const fn new(pool: MarketplacePgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool for `database_url`.
    ///
    /// `acquire_timeout` bounds every connection checkout, including the one
    /// that opens a transaction. This call blocks while the pool establishes
    /// its initial connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the database cannot be
    /// reached within the timeout.
    pub fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(acquire_timeout)
            .build(manager)
            .map_err(StoreError::unavailable)?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &MarketplacePgPool {
        &self.pool
    }

    /// Applies any pending embedded migrations, returning how many ran.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when a connection cannot be obtained or a
    /// migration fails.
    pub async fn run_migrations(&self) -> StoreResult<usize> {
        self.run_blocking(|connection| {
            connection
                .run_pending_migrations(MIGRATIONS)
                .map(|applied| applied.len())
                .map_err(|err| StoreError::Persistence(Arc::from(err)))
        })
        .await
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::unavailable)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::unavailable)?
    }
}

#[async_trait]
impl TaskStore for PostgresMarketplaceStore {
    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let row = NewTaskRow::from_domain(task)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| {
                    if is_primary_key_violation(&err) {
                        StoreError::DuplicateTask(task_id)
                    } else {
                        classify(err)
                    }
                })?;
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(classify)?
                .map(TaskRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let status = filter.status.map(TaskStatus::as_str);
        let client_id = filter.client_id.as_ref().map(|id| id.as_str().to_owned());
        self.run_blocking(move |connection| {
            let mut query = tasks::table.select(TaskRow::as_select()).into_boxed();
            if let Some(wanted) = status {
                query = query.filter(tasks::status.eq(wanted));
            }
            if let Some(poster) = client_id {
                query = query.filter(tasks::client_id.eq(poster));
            }
            query
                .order((tasks::created_at.asc(), tasks::id.asc()))
                .load::<TaskRow>(connection)
                .map_err(classify)?
                .into_iter()
                .map(TaskRow::into_domain)
                .collect()
        })
        .await
    }

    async fn update_task_details(
        &self,
        id: TaskId,
        details: &TaskDetails,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        let title = details.title.as_str().to_owned();
        let description = details
            .description
            .as_ref()
            .map(|text| text.as_str().to_owned());
        let budget = details.budget.map(amount_to_column).transpose()?;
        self.run_blocking(move |connection| {
            diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.into_inner()))
                    .filter(tasks::status.eq(TaskStatus::Open.as_str())),
            )
            .set((
                tasks::title.eq(title),
                tasks::description.eq(description),
                tasks::budget.eq(budget),
                tasks::updated_at.eq(updated_at),
            ))
            .execute(connection)
            .map(WriteOutcome::from_affected)
            .map_err(classify)
        })
        .await
    }

    async fn cancel_task_if_open(
        &self,
        id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        self.run_blocking(move |connection| {
            diesel::update(
                tasks::table
                    .filter(tasks::id.eq(id.into_inner()))
                    .filter(tasks::status.eq(TaskStatus::Open.as_str())),
            )
            .set((
                tasks::status.eq(TaskStatus::Cancelled.as_str()),
                tasks::updated_at.eq(updated_at),
            ))
            .execute(connection)
            .map(WriteOutcome::from_affected)
            .map_err(classify)
        })
        .await
    }
}

fn into_bids(rows: Vec<BidRow>) -> StoreResult<Vec<Bid>> {
    rows.into_iter().map(BidRow::into_domain).collect()
}

#[async_trait]
impl BidStore for PostgresMarketplaceStore {
    async fn find_bid(&self, id: BidId) -> StoreResult<Option<Bid>> {
        self.run_blocking(move |connection| {
            bids::table
                .filter(bids::id.eq(id.into_inner()))
                .select(BidRow::as_select())
                .first::<BidRow>(connection)
                .optional()
                .map_err(classify)?
                .map(BidRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn bids_for_task(&self, task_id: TaskId) -> StoreResult<Vec<Bid>> {
        self.run_blocking(move |connection| {
            let rows = bids::table
                .filter(bids::task_id.eq(task_id.into_inner()))
                .order((bids::created_at.asc(), bids::id.asc()))
                .select(BidRow::as_select())
                .load::<BidRow>(connection)
                .map_err(classify)?;
            into_bids(rows)
        })
        .await
    }

    async fn bids_for_bidder(&self, bidder_id: &BidderId) -> StoreResult<Vec<Bid>> {
        let bidder = bidder_id.as_str().to_owned();
        self.run_blocking(move |connection| {
            let rows = bids::table
                .filter(bids::bidder_id.eq(bidder))
                .order((bids::created_at.asc(), bids::id.asc()))
                .select(BidRow::as_select())
                .load::<BidRow>(connection)
                .map_err(classify)?;
            into_bids(rows)
        })
        .await
    }
}

#[async_trait]
impl TransactionRunner for PostgresMarketplaceStore {
    async fn run_in_transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn TransactionScope) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(StoreError::unavailable(err)))?;
            connection
                .build_transaction()
                .read_committed()
                .run(|conn| {
                    let mut scope = PgScope { conn };
                    work(&mut scope).map_err(ScopeFailure::Work)
                })
                .map_err(|failure| match failure {
                    ScopeFailure::Work(err) => err,
                    ScopeFailure::Database(err) => E::from(classify(err)),
                })
        })
        .await
        .map_err(|err| E::from(StoreError::unavailable(err)))?
    }
}

#[async_trait]
impl ReconciliationStore for PostgresMarketplaceStore {
    async fn orphaned_bid_ids(&self) -> StoreResult<Vec<BidId>> {
        self.run_blocking(|connection| {
            let ids = bids::table
                .filter(not(exists(
                    tasks::table.filter(tasks::id.eq(bids::task_id)),
                )))
                .order((bids::created_at.asc(), bids::id.asc()))
                .select(bids::id)
                .load::<uuid::Uuid>(connection)
                .map_err(classify)?;
            Ok(ids.into_iter().map(BidId::from_uuid).collect())
        })
        .await
    }

    async fn delete_orphaned_bids(&self, ids: &[BidId]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let targets: Vec<uuid::Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        self.run_blocking(move |connection| {
            diesel::delete(
                bids::table
                    .filter(bids::id.eq_any(targets))
                    .filter(not(exists(
                        tasks::table.filter(tasks::id.eq(bids::task_id)),
                    ))),
            )
            .execute(connection)
            .map(affected)
            .map_err(classify)
        })
        .await
    }

    async fn assignment_anomalies(&self) -> StoreResult<Vec<AssignmentAnomaly>> {
        let audits = self
            .run_blocking(|connection| {
                diesel::sql_query(ASSIGNMENT_AUDIT_SQL)
                    .load::<AssignmentAuditRow>(connection)
                    .map_err(classify)?
                    .into_iter()
                    .map(AssignmentAuditRow::into_domain)
                    .collect::<StoreResult<Vec<_>>>()
            })
            .await?;
        Ok(audits
            .into_iter()
            .filter(|audit| !audit.is_consistent())
            .collect())
    }

    async fn bid_count_drift(&self) -> StoreResult<Vec<BidCountDrift>> {
        self.run_blocking(|connection| {
            diesel::sql_query(BID_COUNT_DRIFT_SQL)
                .load::<BidCountRow>(connection)
                .map_err(classify)?
                .into_iter()
                .map(BidCountRow::into_domain)
                .collect()
        })
        .await
    }
}
