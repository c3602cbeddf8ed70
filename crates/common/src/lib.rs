//! Shared infrastructure for the trading server.
//!
//! - `Backoff`: capped exponential backoff with optional jitter, used by the
//!   market feed reconnect loop and the HTTP retry handler.
//! - `VenueEndpoints`: the set of upstream hosts (CLOB, Data API, Gamma,
//!   search, market WebSocket). Tests can point individual hosts at mocks.
//! - `ProcessEnv`: process-level configuration read from the environment.
//! - `init_logging`: tracing subscriber setup for the binary.

mod backoff;
mod environment;
mod logging;

pub use backoff::Backoff;
pub use environment::{ProcessEnv, VenueEndpoints};
pub use logging::init_logging;
