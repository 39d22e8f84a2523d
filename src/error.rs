//! Error taxonomy for the trend pipeline.
//!
//! Each variant maps to a recovery policy:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | [`Upstream`](TrendError::Upstream) / [`UpstreamTransport`](TrendError::UpstreamTransport) | trending reads degrade to the last cached batch; keyword analyses surface it |
//! | [`ModelParse`](TrendError::ModelParse) | always recovered via the heuristic annotation fallback |
//! | [`Validation`](TrendError::Validation) | surfaced as 400, never retried |
//! | [`Store`](TrendError::Store) | reads degrade to cache-miss, writes are logged and skipped |
//! | [`MissingCredential`](TrendError::MissingCredential) | 500 for the video API key, silent fallback for the model key |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrendError {
    /// The video ranking API or the annotation model returned a non-2xx response.
    #[error("upstream API error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a response: connect failure, timeout, bad TLS.
    #[error("upstream request failed: {0}")]
    UpstreamTransport(#[from] reqwest::Error),

    /// The model reply contained no parseable JSON object.
    #[error("model response was not parseable JSON: {reason}")]
    ModelParse { reason: String },

    /// Malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// A persistence read or write failed.
    #[error("store operation failed: {source}")]
    Store {
        #[source]
        source: anyhow::Error,
    },

    /// A required credential is absent from the environment.
    #[error("{name} is not set")]
    MissingCredential { name: &'static str },
}

impl TrendError {
    pub fn store(source: anyhow::Error) -> Self {
        TrendError::Store { source }
    }
}
