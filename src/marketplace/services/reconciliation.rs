//! Integrity sweep over tasks and bids.
//!
//! Both shipped stores keep the invariants transactionally, so a healthy
//! deployment sweeps clean. The sweep removes orphaned bids and reports
//! assignment and counter anomalies for operator repair; it never rewrites
//! task state itself.

use super::error::MarketplaceResult;
use crate::marketplace::ports::{AssignmentAnomaly, BidCountDrift, ReconciliationStore};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Findings of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Orphaned bids deleted during the sweep.
    pub orphans_removed: u64,
    /// Tasks whose status or assignee disagrees with their accepted bids.
    pub assignment_anomalies: Vec<AssignmentAnomaly>,
    /// Tasks whose bid counter disagrees with their bid records.
    pub bid_count_drift: Vec<BidCountDrift>,
}

impl SweepReport {
    /// Returns `true` when the sweep found nothing to repair or report.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.orphans_removed == 0
            && self.assignment_anomalies.is_empty()
            && self.bid_count_drift.is_empty()
    }
}

/// Runs reconciliation sweeps against a store.
#[derive(Clone)]
pub struct ReconciliationService<S>
where
    S: ReconciliationStore,
{
    store: Arc<S>,
}

impl<S> ReconciliationService<S>
where
    S: ReconciliationStore,
{
    /// Creates a service over a shared store.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Runs one sweep.
    ///
    /// # Errors
    ///
    /// Returns [`super::MarketplaceError::Storage`] when any audit query
    /// fails.
    pub async fn sweep(&self) -> MarketplaceResult<SweepReport> {
        let orphans = self.store.orphaned_bid_ids().await?;
        let orphans_removed = if orphans.is_empty() {
            0
        } else {
            self.store.delete_orphaned_bids(&orphans).await?
        };
        if orphans_removed > 0 {
            warn!(orphans_removed, "removed bids referencing deleted tasks");
        }

        let assignment_anomalies = self.store.assignment_anomalies().await?;
        for anomaly in &assignment_anomalies {
            warn!(
                task_id = %anomaly.task_id,
                status = %anomaly.status,
                assigned_bidder = ?anomaly.assigned_bidder.as_ref().map(ToString::to_string),
                accepted_bids = anomaly.accepted_bids,
                "task assignment disagrees with accepted bids"
            );
        }

        let bid_count_drift = self.store.bid_count_drift().await?;
        for drift in &bid_count_drift {
            warn!(
                task_id = %drift.task_id,
                recorded = drift.recorded,
                actual = drift.actual,
                "task bid counter drifted"
            );
        }

        Ok(SweepReport {
            orphans_removed,
            assignment_anomalies,
            bid_count_drift,
        })
    }

    /// Sweeps every `interval` until `shutdown` resolves.
    ///
    /// A failed sweep is logged and retried at the next tick. A zero
    /// interval disables sweeping and returns immediately.
    pub async fn run_periodically<F>(&self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        if interval.is_zero() {
            return;
        }
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        info!(interval_secs = interval.as_secs(), "reconciliation sweeper started");
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        error!(error = %err, "reconciliation sweep failed");
                    }
                }
            }
        }
        info!("reconciliation sweeper stopped");
    }
}
