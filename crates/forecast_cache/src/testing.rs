//! Scriptable upstream used by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use chrono::NaiveDate;
use common::{format_date, Error, Upstream};
use serde_json::{json, Value};
use upstream_client::ForecastUpstream;

#[derive(Debug, Default)]
pub(crate) struct FakeUpstream {
    prediction: Mutex<Option<Bytes>>,
    weather_failures: Mutex<HashSet<NaiveDate>>,
    tide_failures: Mutex<HashSet<NaiveDate>>,
    generation: AtomicU64,
    calls: Mutex<Vec<(Upstream, Option<NaiveDate>)>>,
}

impl FakeUpstream {
    pub(crate) fn set_prediction(&self, body: &'static [u8]) {
        *self.prediction.lock().expect("lock") = Some(Bytes::from_static(body));
    }

    pub(crate) fn clear_prediction(&self) {
        *self.prediction.lock().expect("lock") = None;
    }

    pub(crate) fn fail_weather(&self, date: NaiveDate) {
        self.weather_failures.lock().expect("lock").insert(date);
    }

    pub(crate) fn fail_tide(&self, date: NaiveDate) {
        self.tide_failures.lock().expect("lock").insert(date);
    }

    /// Change every payload returned from now on.
    pub(crate) fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn calls(&self) -> Vec<(Upstream, Option<NaiveDate>)> {
        self.calls.lock().expect("lock").clone()
    }

    fn record(&self, upstream: Upstream, date: Option<NaiveDate>) {
        self.calls.lock().expect("lock").push((upstream, date));
    }

    fn injected(upstream: Upstream) -> Error {
        Error::Status {
            upstream,
            status: 503,
            body: "injected failure".into(),
        }
    }
}

pub(crate) fn weather_payload(date: NaiveDate, generation: u64) -> Value {
    json!({
        "hourly": {"time": [format!("{}T00:00", format_date(date))], "temperature_2m": [10.0]},
        "generation": generation,
    })
}

pub(crate) fn tide_payload(date: NaiveDate, generation: u64) -> Value {
    json!({
        "status": 1,
        "tide": {"chart": {format_date(date): {"tide": [], "flood": [], "edd": []}}},
        "generation": generation,
    })
}

impl ForecastUpstream for FakeUpstream {
    async fn fetch_prediction(&self) -> Result<Bytes, Error> {
        self.record(Upstream::Prediction, None);
        self.prediction
            .lock()
            .expect("lock")
            .clone()
            .ok_or_else(|| Self::injected(Upstream::Prediction))
    }

    async fn fetch_weather(&self, date: NaiveDate) -> Result<Value, Error> {
        self.record(Upstream::Weather, Some(date));
        if self.weather_failures.lock().expect("lock").contains(&date) {
            return Err(Self::injected(Upstream::Weather));
        }
        Ok(weather_payload(date, self.generation.load(Ordering::SeqCst)))
    }

    async fn fetch_tide(&self, date: NaiveDate) -> Result<Value, Error> {
        self.record(Upstream::Tide, Some(date));
        if self.tide_failures.lock().expect("lock").contains(&date) {
            return Err(Self::injected(Upstream::Tide));
        }
        Ok(tide_payload(date, self.generation.load(Ordering::SeqCst)))
    }
}
