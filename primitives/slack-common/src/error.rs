use thiserror::Error;

/// Failure talking to the Slack Web API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport failure, timeout, or an undecodable body.
    #[error("request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with a non-success HTTP status after all retries.
    #[error("{method} returned HTTP status {status}")]
    Status { method: String, status: u16 },

    /// Slack answered `"ok": false`.
    #[error("{method} failed: {error}")]
    Api { method: String, error: String },

    /// The body was valid JSON but did not have the expected shape.
    #[error("unexpected {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}
