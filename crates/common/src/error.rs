//! Unified error type for the forecast server.

use thiserror::Error;

use crate::types::Upstream;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{upstream} request failed: {message}")]
    Transport { upstream: Upstream, message: String },

    #[error("{upstream} returned status {status}: {body}")]
    Status {
        upstream: Upstream,
        status: u16,
        body: String,
    },

    #[error("{upstream} returned malformed JSON: {message}")]
    Malformed { upstream: Upstream, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The upstream service this error came from, if any.
    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            Error::Transport { upstream, .. }
            | Error::Status { upstream, .. }
            | Error::Malformed { upstream, .. } => Some(*upstream),
            _ => None,
        }
    }
}
