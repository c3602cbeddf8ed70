//! HTTP infrastructure shared by the venue clients.
//!
//! A thin wrapper around `reqwest` with:
//!
//! - a 20 s default request timeout,
//! - typed errors that carry the endpoint and classify retryability,
//! - a retry executor with per-class backoff: transport errors back off
//!   exponentially (`500·n² ms`, capped at 5 s), HTTP 429 linearly
//!   (`2 s · n`), HTTP 5xx at a fixed 1 s; three attempts total.

mod client;
mod error;
mod retry;

pub use client::RestClient;
pub use error::RestError;
pub use retry::{retry_delay, with_retry, MAX_ATTEMPTS};
