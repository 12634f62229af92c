//! Prediction feed client.

use bytes::Bytes;
use common::{Error, Upstream};
use tracing::debug;

use crate::http::{fetch_body, validate_json};

/// Client for the prediction feed. The payload is passed through verbatim.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    url: String,
}

impl PredictionClient {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    /// Fetch the whole feed and return it once it is known to be valid JSON.
    pub async fn fetch(&self) -> Result<Bytes, Error> {
        debug!("Fetching prediction feed: {}", self.url);

        let body = fetch_body(Upstream::Prediction, self.client.get(&self.url)).await?;
        validate_json(Upstream::Prediction, &body)?;

        debug!("Prediction feed returned {} bytes", body.len());
        Ok(body)
    }
}
