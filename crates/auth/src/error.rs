use thiserror::Error;

/// Errors from credential handling and request signing.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Address does not match `0x` + 40 hex chars.
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    /// API secret is not valid base64 in either alphabet.
    #[error("API secret is not valid base64")]
    InvalidSecret,

    /// Signing was requested without a complete credential set.
    #[error("credentials not configured")]
    NotConfigured,
}
