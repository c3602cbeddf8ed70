use thiserror::Error;

/// Errors from the venue HTTP clients.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error(transparent)]
    Rest(#[from] rest_client::RestError),

    #[error(transparent)]
    RateLimit(#[from] rate_limit::RateLimitError),

    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    #[error(transparent)]
    Store(#[from] storage::StoreError),

    /// The book response omitted `neg_risk`; without it the verifying
    /// contract is unknown and the order must be refused.
    #[error("market configuration unavailable for token {token_id}")]
    MarketConfigurationUnavailable { token_id: String },

    /// The venue acknowledged the request but refused the order.
    #[error("order rejected: {message}")]
    OrderRejected { message: String },

    /// A response field failed to convert (bad decimal, missing value).
    #[error("malformed response from {endpoint}: {message}")]
    Malformed { endpoint: String, message: String },
}

impl VenueError {
    /// True when a retry at a higher level could help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rest(e) => e.is_retryable(),
            Self::RateLimit(_) => true,
            _ => false,
        }
    }
}
