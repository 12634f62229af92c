//! Scheduled and on-demand refresh entry points.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use upstream_client::ForecastUpstream;

use crate::refresh::{CycleReport, RefreshOrchestrator};

/// Outcome of one prediction refresh plus one detail cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub prediction_updated: bool,
    pub details: CycleReport,
}

/// Cheap, cloneable handle used by the HTTP layer and the scheduler.
pub struct Refresher<U> {
    orchestrator: Arc<RefreshOrchestrator<U>>,
}

impl<U> Clone for Refresher<U> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

impl<U: ForecastUpstream> Refresher<U> {
    pub fn new(orchestrator: RefreshOrchestrator<U>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn orchestrator(&self) -> &RefreshOrchestrator<U> {
        &self.orchestrator
    }

    /// Refresh the prediction feed and every day in the window, concurrently,
    /// and wait for both.
    pub async fn refresh_all(&self) -> RefreshSummary {
        let (prediction_updated, details) = tokio::join!(
            self.orchestrator.refresh_prediction(),
            self.orchestrator.refresh_details(),
        );
        RefreshSummary {
            prediction_updated,
            details,
        }
    }

    /// Start a full refresh in the background and return immediately.
    ///
    /// The refresh does not depend on the caller: dropping the handle leaves it
    /// running.
    pub fn trigger(&self) -> JoinHandle<RefreshSummary> {
        info!("Cache refresh triggered");
        let this = self.clone();
        tokio::spawn(async move { this.refresh_all().await })
    }

    /// Refresh every `period`, forever. The first refresh happens one period
    /// from now; startup refresh is the caller's job.
    pub async fn run_scheduled(self, period: Duration) {
        if period.is_zero() {
            warn!("Scheduled refresh disabled (period is zero)");
            return;
        }

        info!("Scheduled refresh every {}s", period.as_secs());
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let summary = self.refresh_all().await;
            info!(
                "Scheduled refresh done: prediction_updated={} cached={} failed={}",
                summary.prediction_updated,
                summary.details.cached_count(),
                summary.details.failed.len()
            );
        }
    }
}
