//! Copy trading: wallet watcher and trade executor.
//!
//! The watcher polls each tracked wallet's activity at a dynamic interval
//! (`max(3 s, 10 s · N / 100)` for N wallets, keeping total request rate
//! at half the data-API budget), diffs against the previously seen trade
//! ids and publishes `new_trade` events. The executor consumes those
//! events, sizes a copy per the configured mode, clamps price and size to
//! venue minimums, places the order and persists the outcome — at most one
//! copy per source transaction, enforced by the store's unique index.

mod error;
mod executor;
mod sizing;
mod watcher;

pub use error::CopyError;
pub use executor::CopyExecutor;
pub use sizing::{copy_size, FALLBACK_BALANCE, MIN_SHARES};
pub use watcher::{poll_interval, spawn_watcher, WatcherCommand, WatcherHandle};
