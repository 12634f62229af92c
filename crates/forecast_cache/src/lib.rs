//! Forecast aggregation and cache.
//!
//! Fetches the prediction feed and, for each day in the refresh window,
//! weather plus tide data; merges each day into one JSON document and keeps
//! everything in memory for the HTTP layer.

pub mod aggregator;
pub mod refresh;
pub mod store;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use aggregator::{DayAggregator, DayOutcome, DetailDocument};
pub use refresh::{CycleReport, RefreshOrchestrator, RefreshWindow};
pub use store::{new_cache_store, CacheStatus, CacheStore, SharedCacheStore};
pub use trigger::{RefreshSummary, Refresher};
