//! Hourly weather client (Open-Meteo compatible).

use chrono::NaiveDate;
use common::config::WeatherConfig;
use common::{format_date, next_day, Error, Upstream};
use serde_json::Value;
use tracing::debug;

use crate::http::{fetch_body, parse_json};

/// Weather API client.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
    timezone: String,
}

impl WeatherClient {
    /// `timezone` is the reference timezone name the hourly series is aligned to.
    pub fn new(client: reqwest::Client, config: WeatherConfig, timezone: String) -> Self {
        Self {
            client,
            config,
            timezone,
        }
    }

    /// Fetch the hourly forecast covering `[date, date + 1]`.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Value, Error> {
        let query = weather_query(&self.config, &self.timezone, date);
        debug!("Fetching weather for {}: {}", date, self.config.base_url);

        let request = self.client.get(&self.config.base_url).query(&query);
        let body = fetch_body(Upstream::Weather, request).await?;
        parse_json(Upstream::Weather, &body)
    }
}

/// Query string for one day's weather request.
///
/// Upstream treats `end_date` as the last day included, so the series spans
/// the target day and the following one.
pub fn weather_query(
    config: &WeatherConfig,
    timezone: &str,
    date: NaiveDate,
) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", config.latitude.to_string()),
        ("longitude", config.longitude.to_string()),
        ("hourly", config.hourly_fields.join(",")),
        ("timezone", timezone.to_string()),
        ("wind_speed_unit", config.wind_speed_unit.clone()),
        ("start_date", format_date(date)),
        ("end_date", format_date(next_day(date))),
    ]
}
