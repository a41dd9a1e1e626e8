//! Bid workflow properties under serializable `PostgreSQL` transactions.

use std::sync::Arc;

use crate::postgres::helpers::pg_marketplace;
use eyre::ensure;
use skillnest::marketplace::{
    domain::{BidStatus, TaskStatus},
    services::{ErrorKind, MarketplaceError, SubmitBidRequest, UpdateTaskRequest},
};

#[tokio::test(flavor = "multi_thread")]
async fn scenario_assigns_task_and_rejects_sibling() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let task_id = marketplace.post_task("Move a sofa").await?;

    let first = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 100))
        .await?
        .bid_id();
    ensure!(marketplace.catalog.get_task(task_id).await?.bids_count() == 1);
    let second = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "bob", 90).with_message("Today"))
        .await?
        .bid_id();
    ensure!(marketplace.catalog.get_task(task_id).await?.bids_count() == 2);

    let ack = marketplace.workflow.accept_bid(second).await?;
    ensure!(ack.rejected_bids == 1);
    let task = marketplace.catalog.get_task(task_id).await?;
    ensure!(task.status() == TaskStatus::Assigned);
    ensure!(task.assigned_bidder().map(|b| b.as_str()) == Some("bob"));
    ensure!(marketplace.workflow.get_bid(first).await?.status() == BidStatus::Rejected);
    let accepted = marketplace.workflow.get_bid(second).await?;
    ensure!(accepted.status() == BidStatus::Accepted);
    ensure!(accepted.message().map(|m| m.as_str()) == Some("Today"));

    let retry = marketplace.workflow.accept_bid(first).await;
    ensure!(matches!(retry, Err(ref err) if err.kind() == ErrorKind::Conflict));
    ensure!(marketplace.catalog.get_task(task_id).await? == task);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_acceptances_yield_one_winner() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let marketplace = Arc::new(marketplace);
    for round in 0..10 {
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

        let handles = [first, second].map(|bid_id| {
            let shared = Arc::clone(&marketplace);
            tokio::spawn(async move { shared.workflow.accept_bid(bid_id).await })
        });
        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await?);
        }

        let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(err) if err.kind() == ErrorKind::Conflict))
            .count();
        ensure!(winners == 1 && conflicts == 1, "round {round}: {outcomes:?}");
        let accepted = marketplace
            .workflow
            .bids_for_task(task_id)
            .await?
            .into_iter()
            .filter(|bid| bid.status() == BidStatus::Accepted)
            .count();
        ensure!(accepted == 1);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_are_all_counted() -> eyre::Result<()> {
    const BIDDERS: u64 = 12;
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
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
    ensure!(marketplace.sweeper.sweep().await?.bid_count_drift.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_replays_store_one_bid() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let marketplace = Arc::new(marketplace);
    let task_id = marketplace.post_task("Retried").await?;
    let request = SubmitBidRequest::new(task_id, "alice", 50).with_idempotency_key("net-retry");

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = Arc::clone(&marketplace);
            let attempt = request.clone();
            tokio::spawn(async move { shared.workflow.submit_bid(attempt).await })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await??);
    }

    ensure!(outcomes.iter().filter(|outcome| !outcome.is_replay()).count() == 1);
    ensure!(outcomes.windows(2).all(|pair| matches!(pair, [a, b] if a.bid_id() == b.bid_id())));
    ensure!(marketplace.catalog.get_task(task_id).await?.bids_count() == 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_task_cascades_to_its_bids() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let task_id = marketplace.post_task("Short-lived").await?;
    let bid_id = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 10))
        .await?
        .bid_id();
    marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "bob", 12))
        .await?;

    let deletion = marketplace.workflow.delete_task(task_id).await?;

    ensure!(deletion.removed_bids == 2);
    ensure!(matches!(
        marketplace.workflow.get_bid(bid_id).await,
        Err(MarketplaceError::BidNotFound(_))
    ));
    ensure!(marketplace.workflow.bids_for_bidder("alice").await?.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn catalog_edits_stop_once_assigned() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let task_id = marketplace.post_task("Draft").await?;
    let updated = marketplace
        .catalog
        .update_task(task_id, UpdateTaskRequest::new().with_description("Bring a ladder"))
        .await?;
    ensure!(updated.details().description.as_ref().map(|d| d.as_str()) == Some("Bring a ladder"));

    let bid_id = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 10))
        .await?
        .bid_id();
    marketplace.workflow.accept_bid(bid_id).await?;

    let edit = marketplace
        .catalog
        .update_task(task_id, UpdateTaskRequest::new().with_budget(5))
        .await;
    ensure!(matches!(edit, Err(ref err) if err.kind() == ErrorKind::Conflict));
    let cancel = marketplace.catalog.cancel_task(task_id).await;
    ensure!(matches!(cancel, Err(ref err) if err.kind() == ErrorKind::Conflict));
    Ok(())
}
