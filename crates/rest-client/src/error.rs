//! HTTP error taxonomy.

use thiserror::Error;

/// Errors from REST calls, classified per the upstream failure mode.
#[derive(Debug, Error)]
pub enum RestError {
    /// Request exceeded the client timeout.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// DNS/TCP/TLS level failure.
    #[error("connection error on {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// HTTP 429 from the upstream.
    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    /// HTTP 5xx from the upstream.
    #[error("server fault {status} on {endpoint}: {message}")]
    ServerFault {
        status: u16,
        endpoint: String,
        message: String,
    },

    /// HTTP 4xx other than 429; includes 401 for missing/invalid auth.
    /// Never retried.
    #[error("request rejected ({status}) on {endpoint}: {message}")]
    BadRequest {
        status: u16,
        endpoint: String,
        message: String,
    },

    /// Body did not deserialize into the expected shape.
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    /// The client itself could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl RestError {
    /// Whether the retry executor should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connection { .. }
                | Self::RateLimited { .. }
                | Self::ServerFault { .. }
        )
    }

    /// Whether this is an auth failure the caller must surface, not retry.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::BadRequest { status: 401, .. } | Self::BadRequest { status: 403, .. })
    }

    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_decode() {
            Self::Parse {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            Self::Connection {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        }
    }
}
