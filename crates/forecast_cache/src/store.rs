//! In-memory snapshot storage.
//!
//! Two independent read-mostly stores, each behind its own `RwLock`: the
//! prediction blob and the per-day detail documents. Writers only take the
//! lock to swap in a fully prepared value, so readers never see a torn write
//! and never wait on network I/O.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// A stored value with the time it was written.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub body: Bytes,
    pub updated_at: DateTime<Utc>,
}

impl CachedEntry {
    fn new(body: Bytes) -> Self {
        Self {
            body,
            updated_at: Utc::now(),
        }
    }
}

/// Snapshot of what the cache currently holds, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub prediction_available: bool,
    pub prediction_updated_at: Option<DateTime<Utc>>,
    /// Cached detail dates in ascending order.
    pub details: Vec<DetailStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailStatus {
    pub date: NaiveDate,
    pub bytes: usize,
    pub updated_at: DateTime<Utc>,
}

/// The forecast cache.
#[derive(Debug, Default)]
pub struct CacheStore {
    prediction: RwLock<Option<CachedEntry>>,
    detail: RwLock<HashMap<NaiveDate, CachedEntry>>,
}

/// Cache shared between the refresh path and the HTTP handlers.
pub type SharedCacheStore = Arc<CacheStore>;

/// Create a new empty shared cache.
pub fn new_cache_store() -> SharedCacheStore {
    Arc::new(CacheStore::default())
}

impl CacheStore {
    /// Current prediction snapshot, or `None` before the first successful fetch.
    pub async fn get_prediction(&self) -> Option<Bytes> {
        self.prediction
            .read()
            .await
            .as_ref()
            .map(|entry| entry.body.clone())
    }

    /// Current detail document for `date`, or `None` on a miss.
    pub async fn get_detail(&self, date: NaiveDate) -> Option<Bytes> {
        self.detail
            .read()
            .await
            .get(&date)
            .map(|entry| entry.body.clone())
    }

    /// Replace the prediction snapshot.
    pub async fn set_prediction(&self, body: Bytes) {
        let entry = CachedEntry::new(body);
        *self.prediction.write().await = Some(entry);
    }

    /// Replace the detail document for `date`.
    pub async fn set_detail(&self, date: NaiveDate, body: Bytes) {
        let entry = CachedEntry::new(body);
        self.detail.write().await.insert(date, entry);
    }

    pub async fn status(&self) -> CacheStatus {
        let (prediction_available, prediction_updated_at) = {
            let guard = self.prediction.read().await;
            (guard.is_some(), guard.as_ref().map(|e| e.updated_at))
        };

        let mut details: Vec<DetailStatus> = self
            .detail
            .read()
            .await
            .iter()
            .map(|(date, entry)| DetailStatus {
                date: *date,
                bytes: entry.body.len(),
                updated_at: entry.updated_at,
            })
            .collect();
        details.sort_by_key(|d| d.date);

        CacheStatus {
            prediction_available,
            prediction_updated_at,
            details,
        }
    }
}
