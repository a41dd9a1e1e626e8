//! Reconciliation sweep findings against rows corrupted with raw SQL.

use crate::postgres::helpers::pg_marketplace;
use eyre::{ensure, eyre};
use skillnest::marketplace::services::SubmitBidRequest;

#[tokio::test(flavor = "multi_thread")]
async fn consistent_rows_sweep_clean() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let task_id = marketplace.post_task("Healthy").await?;
    let bid_id = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(task_id, "alice", 10))
        .await?
        .bid_id();
    marketplace.workflow.accept_bid(bid_id).await?;

    let report = marketplace.sweeper.sweep().await?;

    ensure!(report.is_clean(), "unexpected findings: {report:?}");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sweep_reports_tampered_rows() -> eyre::Result<()> {
    let Some(marketplace) = pg_marketplace().await? else {
        return Ok(());
    };
    let assigned = marketplace.post_task("Assigned").await?;
    let bid_id = marketplace
        .workflow
        .submit_bid(SubmitBidRequest::new(assigned, "alice", 10))
        .await?
        .bid_id();
    marketplace.workflow.accept_bid(bid_id).await?;
    let drifting = marketplace.post_task("Drifting").await?;

    marketplace.execute(&format!(
        "UPDATE bids SET status = 'pending' WHERE id = '{bid_id}'; \
         UPDATE tasks SET bids_count = 5 WHERE id = '{drifting}';"
    ))?;
    let report = marketplace.sweeper.sweep().await?;

    ensure!(report.orphans_removed == 0);
    let anomaly = report
        .assignment_anomalies
        .first()
        .ok_or_else(|| eyre!("missing anomaly in {report:?}"))?;
    ensure!(report.assignment_anomalies.len() == 1);
    ensure!(anomaly.task_id == assigned);
    ensure!(anomaly.accepted_bids == 0);
    let drift = report
        .bid_count_drift
        .first()
        .ok_or_else(|| eyre!("missing drift in {report:?}"))?;
    ensure!(report.bid_count_drift.len() == 1);
    ensure!(drift.task_id == drifting);
    ensure!(drift.recorded == 5);
    ensure!(drift.actual == 0);
    Ok(())
}
