//! Authenticated access to the venue's HTTP APIs.
//!
//! Two clients share the rate limiter and the credential store:
//!
//! - [`ClobClient`]: the exchange host. Signed requests (order posting,
//!   balance) read credentials live from the store per request; when no
//!   complete credential set exists the request goes out unsigned with a
//!   warning and the venue answers 401.
//! - [`DataClient`]: the public data host. Positions use plain
//!   offset/limit paging; the activity fetch probes one page first and
//!   then fans out in rolling batches of ten concurrent requests behind a
//!   semaphore, reporting progress per batch and stopping early at the
//!   first short page.

mod clob;
mod data;
mod error;
mod responses;

pub use clob::ClobClient;
pub use data::{ActivityProgress, DataClient};
pub use error::VenueError;
pub use responses::{
    ActivityItem, BookLevel, BookResponse, ClobTrade, DataPosition, PostOrderResponse,
};
