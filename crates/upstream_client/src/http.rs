//! Shared HTTP plumbing for the upstream clients.

use std::time::Duration;

use bytes::Bytes;
use common::{Error, Upstream};
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = "forecast-server/0.1";
const MAX_ERROR_BODY: usize = 500;

/// Build the pooled HTTP client shared by every upstream.
///
/// The timeout is mandatory: it is the only bound on a hung upstream call.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .pool_max_idle_per_host(4)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Other(format!("failed to build HTTP client: {e}")))
}

/// Send a prepared GET and return the raw body of a 2xx response.
pub(crate) async fn fetch_body(
    upstream: Upstream,
    request: reqwest::RequestBuilder,
) -> Result<Bytes, Error> {
    let resp = request.send().await.map_err(|e| Error::Transport {
        upstream,
        message: e.to_string(),
    })?;

    debug!("{} responded {} from {}", upstream, resp.status(), resp.url());

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Status {
            upstream,
            status: status.as_u16(),
            body: truncate_body(&body).to_string(),
        });
    }

    resp.bytes().await.map_err(|e| Error::Transport {
        upstream,
        message: format!("failed to read body: {e}"),
    })
}

/// Parse a body into a generic JSON value.
pub(crate) fn parse_json(upstream: Upstream, body: &[u8]) -> Result<Value, Error> {
    serde_json::from_slice(body).map_err(|e| Error::Malformed {
        upstream,
        message: e.to_string(),
    })
}

/// Check that a body is one syntactically valid JSON document.
pub(crate) fn validate_json(upstream: Upstream, body: &[u8]) -> Result<(), Error> {
    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| Error::Malformed {
            upstream,
            message: e.to_string(),
        })
}

fn truncate_body(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
