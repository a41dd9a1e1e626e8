//! Diesel row models and their conversions to domain entities.

use super::schema::{bids, tasks};
use crate::marketplace::{
    domain::{
        Amount, Bid, BidId, BidMessage, BidStatus, BidderId, ClientId, IdempotencyKey,
        PersistedBidData, PersistedTaskData, Task, TaskDescription, TaskDetails, TaskId,
        TaskStatus, TaskTitle,
    },
    ports::{AssignmentAnomaly, BidCountDrift, StoreError, StoreResult},
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Nullable, Text, Uuid as SqlUuid};

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: uuid::Uuid,
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub budget: Option<i64>,
    pub status: String,
    pub bids_count: i64,
    pub assigned_bidder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    pub id: uuid::Uuid,
    pub client_id: String,
    pub title: String,
    pub description: Option<String>,
    pub budget: Option<i64>,
    pub status: String,
    pub bids_count: i64,
    pub assigned_bidder: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query result row for bid records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bids)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BidRow {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    pub bidder_id: String,
    pub amount: i64,
    pub message: Option<String>,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for bid records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bids)]
pub struct NewBidRow {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    pub bidder_id: String,
    pub amount: i64,
    pub message: Option<String>,
    pub status: String,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-task accepted-bid tally used by the assignment audit.
#[derive(Debug, Clone, QueryableByName)]
pub struct AssignmentAuditRow {
    #[diesel(sql_type = SqlUuid)]
    pub task_id: uuid::Uuid,
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub assigned_bidder: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub accepted_bids: i64,
    #[diesel(sql_type = Nullable<Text>)]
    pub accepted_bidder: Option<String>,
}

/// Per-task stored and actual bid counts.
#[derive(Debug, Clone, QueryableByName)]
pub struct BidCountRow {
    #[diesel(sql_type = SqlUuid)]
    pub task_id: uuid::Uuid,
    #[diesel(sql_type = BigInt)]
    pub recorded: i64,
    #[diesel(sql_type = BigInt)]
    pub actual: i64,
}

pub fn amount_to_column(amount: Amount) -> StoreResult<i64> {
    i64::try_from(amount.value()).map_err(StoreError::persistence)
}

fn amount_from_column(value: i64) -> StoreResult<Amount> {
    let unsigned = u64::try_from(value).map_err(StoreError::persistence)?;
    Amount::new(unsigned).map_err(StoreError::persistence)
}

fn count_from_column(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(StoreError::persistence)
}

fn bidder_from_column(value: String) -> StoreResult<BidderId> {
    BidderId::new(value).map_err(StoreError::persistence)
}

impl NewTaskRow {
    pub fn from_domain(task: &Task) -> StoreResult<Self> {
        let details = task.details();
        Ok(Self {
            id: task.id().into_inner(),
            client_id: task.client_id().as_str().to_owned(),
            title: details.title.as_str().to_owned(),
            description: details
                .description
                .as_ref()
                .map(|text| text.as_str().to_owned()),
            budget: details.budget.map(amount_to_column).transpose()?,
            status: task.status().as_str().to_owned(),
            bids_count: i64::try_from(task.bids_count()).map_err(StoreError::persistence)?,
            assigned_bidder: task
                .assigned_bidder()
                .map(|bidder| bidder.as_str().to_owned()),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        })
    }
}

impl TaskRow {
    pub fn into_domain(self) -> StoreResult<Task> {
        let Self {
            id,
            client_id,
            title,
            description,
            budget,
            status,
            bids_count,
            assigned_bidder,
            created_at,
            updated_at,
        } = self;

        let details = TaskDetails {
            title: TaskTitle::new(title).map_err(StoreError::persistence)?,
            description: description
                .map(TaskDescription::parse)
                .transpose()
                .map_err(StoreError::persistence)?
                .flatten(),
            budget: budget.map(amount_from_column).transpose()?,
        };

        Ok(Task::from_persisted(PersistedTaskData {
            id: TaskId::from_uuid(id),
            client_id: ClientId::new(client_id).map_err(StoreError::persistence)?,
            details,
            status: TaskStatus::try_from(status.as_str()).map_err(StoreError::persistence)?,
            bids_count: count_from_column(bids_count)?,
            assigned_bidder: assigned_bidder.map(bidder_from_column).transpose()?,
            created_at,
            updated_at,
        }))
    }
}

impl NewBidRow {
    pub fn from_domain(bid: &Bid) -> StoreResult<Self> {
        Ok(Self {
            id: bid.id().into_inner(),
            task_id: bid.task_id().into_inner(),
            bidder_id: bid.bidder_id().as_str().to_owned(),
            amount: amount_to_column(bid.amount())?,
            message: bid.message().map(|text| text.as_str().to_owned()),
            status: bid.status().as_str().to_owned(),
            idempotency_key: bid.idempotency_key().map(|key| key.as_str().to_owned()),
            created_at: bid.created_at(),
            updated_at: bid.updated_at(),
        })
    }
}

impl BidRow {
    pub fn into_domain(self) -> StoreResult<Bid> {
        let Self {
            id,
            task_id,
            bidder_id,
            amount,
            message,
            status,
            idempotency_key,
            created_at,
            updated_at,
        } = self;

        Ok(Bid::from_persisted(PersistedBidData {
            id: BidId::from_uuid(id),
            task_id: TaskId::from_uuid(task_id),
            bidder_id: bidder_from_column(bidder_id)?,
            amount: amount_from_column(amount)?,
            message: message
                .map(BidMessage::parse)
                .transpose()
                .map_err(StoreError::persistence)?
                .flatten(),
            status: BidStatus::try_from(status.as_str()).map_err(StoreError::persistence)?,
            idempotency_key: idempotency_key
                .map(IdempotencyKey::new)
                .transpose()
                .map_err(StoreError::persistence)?,
            created_at,
            updated_at,
        }))
    }
}

impl AssignmentAuditRow {
    pub fn into_domain(self) -> StoreResult<AssignmentAnomaly> {
        Ok(AssignmentAnomaly {
            task_id: TaskId::from_uuid(self.task_id),
            status: TaskStatus::try_from(self.status.as_str()).map_err(StoreError::persistence)?,
            assigned_bidder: self.assigned_bidder.map(bidder_from_column).transpose()?,
            accepted_bids: count_from_column(self.accepted_bids)?,
            accepted_bidder: self.accepted_bidder.map(bidder_from_column).transpose()?,
        })
    }
}

impl BidCountRow {
    pub fn into_domain(self) -> StoreResult<BidCountDrift> {
        Ok(BidCountDrift {
            task_id: TaskId::from_uuid(self.task_id),
            recorded: count_from_column(self.recorded)?,
            actual: count_from_column(self.actual)?,
        })
    }
}
