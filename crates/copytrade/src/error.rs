use thiserror::Error;

/// Errors from the copy trading subsystem.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error(transparent)]
    Venue(#[from] venue_client::VenueError),

    #[error(transparent)]
    Store(#[from] storage::StoreError),

    #[error(transparent)]
    Signer(#[from] order_signer::SignerError),

    /// Live execution needs a full credential set.
    #[error("credentials not configured")]
    NotConfigured,

    #[error("copy trade {0} not found")]
    UnknownCopyTrade(i64),
}
