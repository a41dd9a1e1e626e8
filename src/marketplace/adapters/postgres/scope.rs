//! Transaction scope over a single `PostgreSQL` connection.

use super::{
    errors::{affected, classify, is_primary_key_violation},
    models::{BidRow, NewBidRow, TaskRow},
    schema::{bids, tasks},
};
use crate::marketplace::{
    domain::{Bid, BidId, BidStatus, BidderId, IdempotencyKey, Task, TaskId, TaskStatus},
    ports::{StoreError, StoreResult, TransactionScope, WriteOutcome},
};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;

/// Scope bound to a connection already inside a `READ COMMITTED` transaction.
pub(super) struct PgScope<'conn> {
    pub(super) conn: &'conn mut PgConnection,
}

impl TransactionScope for PgScope<'_> {
    fn task_for_update(&mut self, id: TaskId) -> StoreResult<Option<Task>> {
        tasks::table
            .filter(tasks::id.eq(id.into_inner()))
            .select(TaskRow::as_select())
            .for_update()
            .first::<TaskRow>(self.conn)
            .optional()
            .map_err(classify)?
            .map(TaskRow::into_domain)
            .transpose()
    }

    fn bid(&mut self, id: BidId) -> StoreResult<Option<Bid>> {
        bids::table
            .filter(bids::id.eq(id.into_inner()))
            .select(BidRow::as_select())
            .first::<BidRow>(self.conn)
            .optional()
            .map_err(classify)?
            .map(BidRow::into_domain)
            .transpose()
    }

    fn bid_by_idempotency_key(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        key: &IdempotencyKey,
    ) -> StoreResult<Option<Bid>> {
        bids::table
            .filter(bids::task_id.eq(task_id.into_inner()))
            .filter(bids::bidder_id.eq(bidder_id.as_str()))
            .filter(bids::idempotency_key.eq(key.as_str()))
            .select(BidRow::as_select())
            .first::<BidRow>(self.conn)
            .optional()
            .map_err(classify)?
            .map(BidRow::into_domain)
            .transpose()
    }

    fn insert_bid(&mut self, bid: &Bid) -> StoreResult<()> {
        let row = NewBidRow::from_domain(bid)?;
        diesel::insert_into(bids::table)
            .values(&row)
            .execute(self.conn)
            .map_err(|err| {
                if is_primary_key_violation(&err) {
                    StoreError::DuplicateBid(bid.id())
                } else {
                    classify(err)
                }
            })?;
        Ok(())
    }

    fn increment_bids_count(
        &mut self,
        task_id: TaskId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
            .set((
                tasks::bids_count.eq(tasks::bids_count + 1_i64),
                tasks::updated_at.eq(updated_at),
            ))
            .execute(self.conn)
            .map(WriteOutcome::from_affected)
            .map_err(classify)
    }

    fn accept_pending_bid(
        &mut self,
        bid_id: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        diesel::update(
            bids::table
                .filter(bids::id.eq(bid_id.into_inner()))
                .filter(bids::status.eq(BidStatus::Pending.as_str())),
        )
        .set((
            bids::status.eq(BidStatus::Accepted.as_str()),
            bids::updated_at.eq(updated_at),
        ))
        .execute(self.conn)
        .map(WriteOutcome::from_affected)
        .map_err(classify)
    }

    fn reject_pending_siblings(
        &mut self,
        task_id: TaskId,
        winner: BidId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        diesel::update(
            bids::table
                .filter(bids::task_id.eq(task_id.into_inner()))
                .filter(bids::id.ne(winner.into_inner()))
                .filter(bids::status.eq(BidStatus::Pending.as_str())),
        )
        .set((
            bids::status.eq(BidStatus::Rejected.as_str()),
            bids::updated_at.eq(updated_at),
        ))
        .execute(self.conn)
        .map(affected)
        .map_err(classify)
    }

    fn assign_open_task(
        &mut self,
        task_id: TaskId,
        bidder_id: &BidderId,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<WriteOutcome> {
        diesel::update(
            tasks::table
                .filter(tasks::id.eq(task_id.into_inner()))
                .filter(tasks::status.eq(TaskStatus::Open.as_str())),
        )
        .set((
            tasks::status.eq(TaskStatus::Assigned.as_str()),
            tasks::assigned_bidder.eq(Some(bidder_id.as_str())),
            tasks::updated_at.eq(updated_at),
        ))
        .execute(self.conn)
        .map(WriteOutcome::from_affected)
        .map_err(classify)
    }

    fn delete_bids_for_task(&mut self, task_id: TaskId) -> StoreResult<u64> {
        diesel::delete(bids::table.filter(bids::task_id.eq(task_id.into_inner())))
            .execute(self.conn)
            .map(affected)
            .map_err(classify)
    }

    fn delete_task(&mut self, task_id: TaskId) -> StoreResult<WriteOutcome> {
        diesel::delete(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
            .execute(self.conn)
            .map(WriteOutcome::from_affected)
            .map_err(classify)
    }
}
