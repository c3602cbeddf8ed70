//! Live market data over the venue's WebSocket.
//!
//! One long-lived task owns the connection. Callers interact through a
//! cloneable [`FeedHandle`]: subscription changes go in through a command
//! channel, parsed [`FeedEvent`]s fan out through a broadcast channel, and
//! batched order traffic is republished onto the event bus for the UI.
//!
//! The task reconnects with 500 ms → 5 s backoff, re-sends the union of
//! desired subscriptions on every (re)connect, and forces a resubscribe
//! when no message has arrived for 15 s while subscriptions exist.

mod feed;
mod metrics;
mod protocol;

pub use feed::{spawn_feed, FeedCommand, FeedHandle};
pub use metrics::{FeedMetrics, FeedSnapshot};
pub use protocol::{FeedEvent, FeedTrade, PriceChange};
