//! Upstream API clients.
//!
//! One client per external service (prediction feed, weather, tide), all
//! sharing a single pooled `reqwest::Client` with an explicit timeout. Each
//! call is a single GET: no retries, no shared state.

pub mod http;
pub mod prediction;
pub mod tide;
pub mod weather;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;
use common::{AppConfig, Error};
use serde_json::Value;

pub use prediction::PredictionClient;
pub use tide::TideClient;
pub use weather::WeatherClient;

/// The three upstream fetches the cache is built from.
pub trait ForecastUpstream: Send + Sync + 'static {
    /// The full prediction feed as validated JSON bytes.
    fn fetch_prediction(&self) -> impl Future<Output = Result<Bytes, Error>> + Send;

    /// Hourly weather for `[date, date + 1]`.
    fn fetch_weather(&self, date: NaiveDate) -> impl Future<Output = Result<Value, Error>> + Send;

    /// Tide table for `date`.
    fn fetch_tide(&self, date: NaiveDate) -> impl Future<Output = Result<Value, Error>> + Send;
}

/// HTTP-backed upstream set.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    prediction: PredictionClient,
    weather: WeatherClient,
    tide: TideClient,
}

impl HttpUpstream {
    pub fn new(config: &AppConfig) -> Result<Self, Error> {
        if config.prediction_url.trim().is_empty() {
            return Err(Error::Config("prediction URL is required".into()));
        }

        let client = http::build_client(Duration::from_secs(config.refresh.request_timeout_secs))?;

        Ok(Self {
            prediction: PredictionClient::new(client.clone(), config.prediction_url.clone()),
            weather: WeatherClient::new(
                client.clone(),
                config.weather.clone(),
                config.timezone.trim().to_string(),
            ),
            tide: TideClient::new(client, config.tide.clone()),
        })
    }
}

impl ForecastUpstream for HttpUpstream {
    async fn fetch_prediction(&self) -> Result<Bytes, Error> {
        self.prediction.fetch().await
    }

    async fn fetch_weather(&self, date: NaiveDate) -> Result<Value, Error> {
        self.weather.fetch_day(date).await
    }

    async fn fetch_tide(&self, date: NaiveDate) -> Result<Value, Error> {
        self.tide.fetch_day(date).await
    }
}
