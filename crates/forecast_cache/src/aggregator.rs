//! Per-day aggregation: weather + same-day tide + next-day tide.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use common::{next_day, Error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use upstream_client::ForecastUpstream;

use crate::store::SharedCacheStore;

/// The combined document cached for one day.
///
/// `next_tide` lets clients draw a tide chart that runs past midnight; it is
/// `null` when that fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailDocument {
    pub weather: Value,
    pub tide: Value,
    #[serde(rename = "nextTide")]
    pub next_tide: Option<Value>,
}

impl DetailDocument {
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// How a day ended up in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Complete,
    /// Cached with `nextTide: null`.
    MissingNextTide,
}

/// Builds and stores the detail document for a single day.
pub struct DayAggregator<U> {
    upstream: Arc<U>,
    store: SharedCacheStore,
}

impl<U> Clone for DayAggregator<U> {
    fn clone(&self) -> Self {
        Self {
            upstream: Arc::clone(&self.upstream),
            store: Arc::clone(&self.store),
        }
    }
}

impl<U: ForecastUpstream> DayAggregator<U> {
    pub fn new(upstream: Arc<U>, store: SharedCacheStore) -> Self {
        Self { upstream, store }
    }

    /// Fetch, merge and cache the document for `date`.
    ///
    /// Weather and same-day tide are mandatory: if either fails nothing is
    /// written and any earlier document for the day stays visible. A failed
    /// next-day tide only degrades the document.
    pub async fn aggregate(&self, date: NaiveDate) -> Result<DayOutcome, Error> {
        let next = next_day(date);
        let (weather, tide, next_tide) = tokio::join!(
            self.upstream.fetch_weather(date),
            self.upstream.fetch_tide(date),
            self.upstream.fetch_tide(next),
        );

        let weather = weather.inspect_err(|e| error!("Weather fetch failed for {}: {}", date, e))?;
        let tide = tide.inspect_err(|e| error!("Tide fetch failed for {}: {}", date, e))?;
        let next_tide = match next_tide {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(
                    "Next-day tide fetch failed for {} ({}), caching without it: {}",
                    date, next, e
                );
                None
            }
        };

        let outcome = if next_tide.is_some() {
            DayOutcome::Complete
        } else {
            DayOutcome::MissingNextTide
        };

        let body = DetailDocument {
            weather,
            tide,
            next_tide,
        }
        .to_bytes()
        .inspect_err(|e| error!("Failed to serialize detail for {}: {}", date, e))?;

        let len = body.len();
        self.store.set_detail(date, body).await;
        info!("Cached detail for {} ({} bytes, {:?})", date, len, outcome);

        Ok(outcome)
    }
}
