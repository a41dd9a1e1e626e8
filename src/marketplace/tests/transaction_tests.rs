//! In-memory transaction commit and rollback tests.

use super::support::{Marketplace, marketplace};
use crate::marketplace::{
    domain::{Amount, Bid, BidId, BidStatus, BidSubmission, BidderId, TaskId},
    ports::{BidStore, StoreError, TransactionRunner, WriteOutcome},
    services::{MarketplaceError, SubmitBidRequest},
};
use chrono::Utc;
use eyre::ensure;
use mockable::DefaultClock;
use rstest::rstest;

fn pending_bid(task_id: TaskId) -> eyre::Result<Bid> {
    let submission = BidSubmission {
        task_id,
        bidder_id: BidderId::new("alice")?,
        amount: Amount::new(25)?,
        message: None,
        idempotency_key: None,
    };
    Ok(Bid::submit(submission, &DefaultClock))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_work_discards_every_write(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Rollback").await?;
    let bid = pending_bid(task_id)?;
    let bid_id = bid.id();

    let result: Result<(), MarketplaceError> = marketplace
        .store
        .run_in_transaction(move |scope| {
            scope.insert_bid(&bid)?;
            scope
                .increment_bids_count(task_id, Utc::now())?
                .require(|| MarketplaceError::TaskNotFound(task_id))?;
            Err(MarketplaceError::TaskNotFound(task_id))
        })
        .await;

    ensure!(result.is_err());
    ensure!(marketplace.store.find_bid(bid_id).await?.is_none());
    ensure!(marketplace.task(task_id).await?.bids_count() == 0);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_work_commits_every_write(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Commit").await?;
    let bid = pending_bid(task_id)?;
    let bid_id = bid.id();

    let outcome = marketplace
        .store
        .run_in_transaction(move |scope| {
            scope.insert_bid(&bid)?;
            scope.increment_bids_count(task_id, Utc::now())
        })
        .await?;

    ensure!(outcome == WriteOutcome::Applied);
    ensure!(marketplace.store.find_bid(bid_id).await?.is_some());
    ensure!(marketplace.task(task_id).await?.bids_count() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conditional_writes_report_unmatched(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Guards").await?;
    let missing = TaskId::new();
    let bidder = BidderId::new("bob")?;

    let outcomes = marketplace
        .store
        .run_in_transaction(move |scope| {
            let now = Utc::now();
            Ok::<_, StoreError>((
                scope.increment_bids_count(missing, now)?,
                scope.assign_open_task(missing, &bidder, now)?,
                scope.delete_task(missing)?,
                scope.accept_pending_bid(BidId::new(), now)?,
                scope.assign_open_task(task_id, &bidder, now)?,
                scope.assign_open_task(task_id, &bidder, now)?,
            ))
        })
        .await?;

    ensure!(outcomes.0 == WriteOutcome::Unmatched);
    ensure!(outcomes.1 == WriteOutcome::Unmatched);
    ensure!(outcomes.2 == WriteOutcome::Unmatched);
    ensure!(outcomes.3 == WriteOutcome::Unmatched);
    ensure!(outcomes.4 == WriteOutcome::Applied);
    ensure!(outcomes.5 == WriteOutcome::Unmatched);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_bid_insert_is_reported(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Duplicates").await?;
    let bid = pending_bid(task_id)?;
    let bid_id = bid.id();

    let result = marketplace
        .store
        .run_in_transaction(move |scope| {
            scope.insert_bid(&bid)?;
            scope.insert_bid(&bid)
        })
        .await;

    ensure!(matches!(result, Err(StoreError::DuplicateBid(id)) if id == bid_id));
    ensure!(marketplace.store.find_bid(bid_id).await?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_work_restores_edited_and_removed_records(
    marketplace: Marketplace,
) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Restore me").await?;
    let first = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 10))
        .await?
        .bid_id();
    let second = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "bob", 12))
        .await?
        .bid_id();
    let before = marketplace.task(task_id).await?;

    let result: Result<(), MarketplaceError> = marketplace
        .store
        .run_in_transaction(move |scope| {
            let now = Utc::now();
            scope
                .accept_pending_bid(first, now)?
                .require(|| MarketplaceError::BidNotFound(first))?;
            scope.reject_pending_siblings(task_id, first, now)?;
            scope.delete_bids_for_task(task_id)?;
            scope
                .delete_task(task_id)?
                .require(|| MarketplaceError::TaskNotFound(task_id))?;
            Err(MarketplaceError::TaskNotFound(task_id))
        })
        .await;

    ensure!(result.is_err());
    ensure!(marketplace.task(task_id).await? == before);
    for bid_id in [first, second] {
        let bid = marketplace
            .store
            .find_bid(bid_id)
            .await?
            .ok_or_else(|| eyre::eyre!("bid {bid_id} was not restored"))?;
        ensure!(bid.status() == BidStatus::Pending);
    }
    Ok(())
}
