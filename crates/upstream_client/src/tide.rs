//! Daily tide client (tide736 compatible).

use chrono::{Datelike, NaiveDate};
use common::config::TideConfig;
use common::{Error, Upstream};
use serde_json::Value;
use tracing::debug;

use crate::http::{fetch_body, parse_json};

/// Tide API client for one fixed station.
#[derive(Debug, Clone)]
pub struct TideClient {
    client: reqwest::Client,
    config: TideConfig,
}

impl TideClient {
    pub fn new(client: reqwest::Client, config: TideConfig) -> Self {
        Self { client, config }
    }

    /// Fetch the tide table for exactly `date`.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Value, Error> {
        let query = tide_query(&self.config, date);
        debug!("Fetching tide for {}: {}", date, self.config.base_url);

        let request = self.client.get(&self.config.base_url).query(&query);
        let body = fetch_body(Upstream::Tide, request).await?;
        parse_json(Upstream::Tide, &body)
    }
}

/// Query string for one day's tide request. Month and day are not zero-padded.
pub fn tide_query(config: &TideConfig, date: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("pc", config.prefecture_code.to_string()),
        ("hc", config.harbor_code.to_string()),
        ("yr", date.year().to_string()),
        ("mn", date.month().to_string()),
        ("dy", date.day().to_string()),
        ("rg", "day".to_string()),
    ]
}
