//! Refresh cycles: the prediction feed and the per-day fan-out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use common::{local_date, AppConfig, Error};
use tokio::task::JoinSet;
use tracing::{error, info};
use upstream_client::ForecastUpstream;

use crate::aggregator::{DayAggregator, DayOutcome};
use crate::store::SharedCacheStore;

/// Default delay before each per-day launch.
pub const DEFAULT_LAUNCH_INTERVAL: Duration = Duration::from_millis(250);

/// Range of days refreshed around "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshWindow {
    pub days_back: u32,
    pub days_ahead: u32,
}

impl Default for RefreshWindow {
    /// Yesterday through six days ahead.
    fn default() -> Self {
        Self {
            days_back: 1,
            days_ahead: 6,
        }
    }
}

impl RefreshWindow {
    /// Dates covered when "today" is `today`, oldest first.
    pub fn dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let Some(start) = today.checked_sub_days(Days::new(u64::from(self.days_back))) else {
            return Vec::new();
        };
        let span = u64::from(self.days_back) + u64::from(self.days_ahead);
        (0..=span)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .collect()
    }
}

/// Result of one detail cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Cached with all three parts.
    pub complete: Vec<NaiveDate>,
    /// Cached with `nextTide: null`.
    pub degraded: Vec<NaiveDate>,
    /// Not written this cycle.
    pub failed: Vec<NaiveDate>,
}

impl CycleReport {
    pub fn cached_count(&self) -> usize {
        self.complete.len() + self.degraded.len()
    }

    fn sort(&mut self) {
        self.complete.sort();
        self.degraded.sort();
        self.failed.sort();
    }
}

/// Drives refresh cycles against one upstream set and one cache.
pub struct RefreshOrchestrator<U> {
    upstream: Arc<U>,
    store: SharedCacheStore,
    aggregator: DayAggregator<U>,
    tz: Tz,
    window: RefreshWindow,
    launch_interval: Duration,
}

impl<U: ForecastUpstream> RefreshOrchestrator<U> {
    pub fn new(upstream: Arc<U>, store: SharedCacheStore, tz: Tz) -> Self {
        let aggregator = DayAggregator::new(upstream.clone(), store.clone());
        Self {
            upstream,
            store,
            aggregator,
            tz,
            window: RefreshWindow::default(),
            launch_interval: DEFAULT_LAUNCH_INTERVAL,
        }
    }

    /// Build from the server configuration.
    pub fn from_config(
        upstream: Arc<U>,
        store: SharedCacheStore,
        config: &AppConfig,
    ) -> Result<Self, Error> {
        let tz = config.reference_tz()?;
        Ok(Self::new(upstream, store, tz)
            .with_window(RefreshWindow {
                days_back: config.refresh.days_back,
                days_ahead: config.refresh.days_ahead,
            })
            .with_launch_interval(Duration::from_millis(config.refresh.launch_interval_ms)))
    }

    pub fn with_window(mut self, window: RefreshWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_launch_interval(mut self, interval: Duration) -> Self {
        self.launch_interval = interval;
        self
    }

    pub fn store(&self) -> &SharedCacheStore {
        &self.store
    }

    /// "Today" in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        local_date(Utc::now(), self.tz)
    }

    /// Fetch the prediction feed once. Returns whether the snapshot was replaced.
    ///
    /// On failure the previous snapshot, or its absence, is left untouched.
    pub async fn refresh_prediction(&self) -> bool {
        match self.upstream.fetch_prediction().await {
            Ok(body) => {
                let len = body.len();
                self.store.set_prediction(body).await;
                info!("Cached new prediction snapshot ({} bytes)", len);
                true
            }
            Err(e) => {
                error!("Prediction refresh failed: {}", e);
                false
            }
        }
    }

    /// Run one detail cycle over the window around the current date.
    pub async fn refresh_details(&self) -> CycleReport {
        self.refresh_details_for(self.today()).await
    }

    /// Run one detail cycle over the window around `today`.
    ///
    /// One task per date, launched `launch_interval` apart. Every task runs to
    /// completion; a failed date never affects its siblings.
    pub async fn refresh_details_for(&self, today: NaiveDate) -> CycleReport {
        let dates = self.window.dates(today);
        info!(
            "Starting detail refresh: {} days from {:?} to {:?}",
            dates.len(),
            dates.first(),
            dates.last()
        );
        let started = Instant::now();

        let mut tasks = JoinSet::new();
        for date in dates.iter().copied() {
            tokio::time::sleep(self.launch_interval).await;
            let aggregator = self.aggregator.clone();
            tasks.spawn(async move {
                let result = aggregator.aggregate(date).await;
                (date, result)
            });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((date, Ok(DayOutcome::Complete))) => report.complete.push(date),
                Ok((date, Ok(DayOutcome::MissingNextTide))) => report.degraded.push(date),
                Ok((date, Err(_))) => report.failed.push(date),
                Err(e) => error!("Detail task aborted: {}", e),
            }
        }

        // Aborted tasks never report their date.
        for date in dates {
            if !report.complete.contains(&date)
                && !report.degraded.contains(&date)
                && !report.failed.contains(&date)
            {
                report.failed.push(date);
            }
        }
        report.sort();

        info!(
            "Detail refresh finished in {:.1}s: {} complete, {} without next-day tide, {} failed",
            started.elapsed().as_secs_f64(),
            report.complete.len(),
            report.degraded.len(),
            report.failed.len()
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::DetailDocument;
    use crate::store::new_cache_store;
    use crate::testing::{tide_payload, weather_payload, FakeUpstream};
    use common::{parse_date, Upstream};

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).expect("valid date")
    }

    fn orchestrator() -> (Arc<FakeUpstream>, RefreshOrchestrator<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::default());
        let orchestrator =
            RefreshOrchestrator::new(upstream.clone(), new_cache_store(), chrono_tz::Asia::Tokyo)
                .with_launch_interval(Duration::ZERO);
        (upstream, orchestrator)
    }

    #[test]
    fn test_default_window_is_yesterday_through_six_days_ahead() {
        let dates = RefreshWindow::default().dates(date("2024-03-10"));
        let expected: Vec<NaiveDate> = (9..=16)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date"))
            .collect();
        assert_eq!(dates, expected);
    }

    #[test]
    fn test_window_crosses_year_boundary() {
        let dates = RefreshWindow::default().dates(date("2024-12-28"));
        assert_eq!(dates.len(), 8);
        assert_eq!(dates[0], date("2024-12-27"));
        assert_eq!(dates[7], date("2025-01-03"));
    }

    #[tokio::test]
    async fn test_cycle_targets_window_and_next_day_tide() {
        let (upstream, orchestrator) = orchestrator();

        let report = orchestrator.refresh_details_for(date("2024-03-10")).await;
        assert_eq!(report.complete.len(), 8);
        assert!(report.failed.is_empty());

        let calls = upstream.calls();
        let weather_dates: Vec<NaiveDate> = {
            let mut v: Vec<NaiveDate> = calls
                .iter()
                .filter(|(u, _)| *u == Upstream::Weather)
                .filter_map(|(_, d)| *d)
                .collect();
            v.sort();
            v
        };
        assert_eq!(weather_dates.first(), Some(&date("2024-03-09")));
        assert_eq!(weather_dates.last(), Some(&date("2024-03-16")));
        assert_eq!(weather_dates.len(), 8);

        // 8 same-day tide calls plus 8 next-day ones; the latest reaches the 17th.
        let tide_calls: Vec<NaiveDate> = calls
            .iter()
            .filter(|(u, _)| *u == Upstream::Tide)
            .filter_map(|(_, d)| *d)
            .collect();
        assert_eq!(tide_calls.len(), 16);
        assert!(tide_calls.contains(&date("2024-03-17")));

        let doc: DetailDocument = serde_json::from_slice(
            &orchestrator
                .store()
                .get_detail(date("2024-03-09"))
                .await
                .expect("cached"),
        )
        .expect("valid document");
        assert_eq!(doc.next_tide, Some(tide_payload(date("2024-03-10"), 0)));
    }

    #[tokio::test]
    async fn test_failed_day_is_isolated() {
        let (upstream, orchestrator) = orchestrator();
        upstream.fail_weather(date("2024-03-12"));

        let report = orchestrator.refresh_details_for(date("2024-03-10")).await;
        assert_eq!(report.failed, vec![date("2024-03-12")]);
        assert_eq!(report.cached_count(), 7);

        let store = orchestrator.store();
        assert!(store.get_detail(date("2024-03-11")).await.is_some());
        assert!(store.get_detail(date("2024-03-12")).await.is_none());
        assert!(store.get_detail(date("2024-03-13")).await.is_some());
    }

    #[tokio::test]
    async fn test_missing_next_tide_only_degrades_its_day() {
        let (upstream, orchestrator) = orchestrator();
        // The 17th is only requested as the next-day tide of the 16th.
        upstream.fail_tide(date("2024-03-17"));

        let report = orchestrator.refresh_details_for(date("2024-03-10")).await;
        assert_eq!(report.degraded, vec![date("2024-03-16")]);
        assert_eq!(report.complete.len(), 7);
        assert!(orchestrator.store().get_detail(date("2024-03-16")).await.is_some());
    }

    #[tokio::test]
    async fn test_second_cycle_replaces_first() {
        let (upstream, orchestrator) = orchestrator();
        let today = date("2024-03-10");

        orchestrator.refresh_details_for(today).await;
        let generation = upstream.bump_generation();
        orchestrator.refresh_details_for(today).await;

        for day in RefreshWindow::default().dates(today) {
            let expected = DetailDocument {
                weather: weather_payload(day, generation),
                tide: tide_payload(day, generation),
                next_tide: Some(tide_payload(common::next_day(day), generation)),
            }
            .to_bytes()
            .expect("serializes");
            let cached = orchestrator.store().get_detail(day).await.expect("cached");
            assert_eq!(cached, expected, "document for {day} not replaced");
        }
    }

    #[tokio::test]
    async fn test_prediction_absent_until_first_success() {
        let (upstream, orchestrator) = orchestrator();

        assert!(!orchestrator.refresh_prediction().await);
        assert!(orchestrator.store().get_prediction().await.is_none());

        upstream.set_prediction(br#"{"forecast":[1,2,3]}"#);
        assert!(orchestrator.refresh_prediction().await);
        assert_eq!(
            orchestrator.store().get_prediction().await.as_deref(),
            Some(br#"{"forecast":[1,2,3]}"#.as_slice())
        );

        // A later failure leaves the last snapshot in place.
        upstream.clear_prediction();
        assert!(!orchestrator.refresh_prediction().await);
        assert_eq!(
            orchestrator.store().get_prediction().await.as_deref(),
            Some(br#"{"forecast":[1,2,3]}"#.as_slice())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_are_spaced() {
        let (_, orchestrator) = orchestrator();
        let orchestrator = orchestrator.with_launch_interval(Duration::from_millis(250));

        let started = tokio::time::Instant::now();
        let report = orchestrator.refresh_details_for(date("2024-03-10")).await;

        assert_eq!(report.complete.len(), 8);
        assert!(started.elapsed() >= Duration::from_millis(8 * 250));
    }

    #[test]
    fn test_from_config_rejects_unknown_timezone() {
        let config = AppConfig {
            timezone: "Nowhere/Special".into(),
            ..AppConfig::default()
        };
        let result = RefreshOrchestrator::from_config(
            Arc::new(FakeUpstream::default()),
            new_cache_store(),
            &config,
        );
        assert!(result.is_err());
    }
}
