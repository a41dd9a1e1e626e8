//! Concurrency properties of [`BidWorkflow`] over the in-memory store.
//!
//! [`BidWorkflow`]: skillnest::marketplace::services::BidWorkflow

use std::sync::Arc;

use crate::in_memory::helpers::{Marketplace, marketplace};
use eyre::ensure;
use rstest::rstest;
use skillnest::marketplace::{
    domain::{BidStatus, TaskStatus},
    services::{ErrorKind, SubmitBidRequest},
};

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acceptances_yield_one_winner(marketplace: Marketplace) -> eyre::Result<()> {
    let marketplace = Arc::new(marketplace);
    for round in 0..20 {
        let task_id = marketplace.post_task(&format!("Race {round}")).await?;
        let first = marketplace
            .workflow
            .submit_bid(SubmitBidRequest::new(task_id, "alice", 100))
            .await?
            .bid_id();
        let second = marketplace
            .workflow
            .submit_bid(SubmitBidRequest::new(task_id, "bob", 90))
            .await?
            .bid_id();

        let left = tokio::spawn({
            let shared = Arc::clone(&marketplace);
            async move { shared.workflow.accept_bid(first).await }
        });
        let right = tokio::spawn({
            let shared = Arc::clone(&marketplace);
            async move { shared.workflow.accept_bid(second).await }
        });
        let outcomes = [left.await?, right.await?];

        let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(err) if err.kind() == ErrorKind::Conflict))
            .count();
        ensure!(winners == 1, "round {round}: {outcomes:?}");
        ensure!(conflicts == 1, "round {round}: {outcomes:?}");

        let bids = marketplace.workflow.bids_for_task(task_id).await?;
        let accepted: Vec<_> = bids
            .iter()
            .filter(|bid| bid.status() == BidStatus::Accepted)
            .collect();
        ensure!(accepted.len() == 1);
        let task = marketplace.catalog.get_task(task_id).await?;
        ensure!(task.status() == TaskStatus::Assigned);
        ensure!(task.assigned_bidder() == accepted.first().map(|bid| bid.bidder_id()));
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_are_all_counted(marketplace: Marketplace) -> eyre::Result<()> {
    const BIDDERS: u64 = 32;
    let marketplace = Arc::new(marketplace);
    let task_id = marketplace.post_task("Popular").await?;

    let handles: Vec<_> = (0..BIDDERS)
        .map(|n| {
            let shared = Arc::clone(&marketplace);
            tokio::spawn(async move {
                shared
                    .workflow
                    .submit_bid(SubmitBidRequest::new(task_id, format!("bidder-{n}"), n + 1))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }

    ensure!(marketplace.catalog.get_task(task_id).await?.bids_count() == BIDDERS);
    ensure!(marketplace.workflow.bids_for_task(task_id).await?.len() == 32);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replays_store_one_bid(marketplace: Marketplace) -> eyre::Result<()> {
    let marketplace = Arc::new(marketplace);
    let task_id = marketplace.post_task("Retried").await?;
    let request = SubmitBidRequest::new(task_id, "alice", 50).with_idempotency_key("net-retry");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&marketplace);
            let attempt = request.clone();
            tokio::spawn(async move { shared.workflow.submit_bid(attempt).await })
        })
        .collect();
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??);
    }

    let created = ids.iter().filter(|outcome| !outcome.is_replay()).count();
    ensure!(created == 1);
    ensure!(ids.windows(2).all(|pair| matches!(pair, [a, b] if a.bid_id() == b.bid_id())));
    ensure!(marketplace.catalog.get_task(task_id).await?.bids_count() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deletion_leaves_no_retrievable_bids(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Short-lived").await?;
    let mut bid_ids = Vec::new();
    for bidder in ["alice", "bob", "carol"] {
        let outcome = marketplace
            .workflow
            .submit_bid(SubmitBidRequest::new(task_id, bidder, 10))
            .await?;
        bid_ids.push(outcome.bid_id());
    }

    let deletion = marketplace.workflow.delete_task(task_id).await?;

    ensure!(deletion.removed_bids == 3);
    for bid_id in bid_ids {
        let lookup = marketplace.workflow.get_bid(bid_id).await;
        ensure!(matches!(lookup, Err(ref err) if err.kind() == ErrorKind::NotFound));
    }
    ensure!(marketplace.workflow.bids_for_bidder("bob").await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn terminal_bids_cannot_be_accepted(marketplace: Marketplace) -> eyre::Result<()> {
    let task_id = marketplace.post_task("Settled").await?;
    let winner = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 10))
        .await?
        .bid_id();
    let loser = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "bob", 9))
        .await?
        .bid_id();
    marketplace.workflow.accept_bid(winner).await?;
    let before = marketplace.catalog.get_task(task_id).await?;

    for bid_id in [winner, loser] {
        let result = marketplace.workflow.accept_bid(bid_id).await;
        ensure!(matches!(result, Err(ref err) if err.kind() == ErrorKind::Conflict));
    }

    ensure!(marketplace.catalog.get_task(task_id).await? == before);
    ensure!(marketplace.workflow.get_bid(winner).await?.status() == BidStatus::Accepted);
    ensure!(marketplace.workflow.get_bid(loser).await?.status() == BidStatus::Rejected);
    Ok(())
}
