//! Embedded relational persistence.
//!
//! A single sqlite file co-located with the executable. Migrations run at
//! boot; every table from the data model has a repository on [`Store`]:
//! credentials (singleton row), copy-trading settings (singleton row),
//! tracked users, copy trades (idempotent on `original_trade_id`),
//! strategies, strategy events (append-only), positions (unique per
//! `(strategy_id, token_id)`) and trades.
//!
//! `Store` is cheap to clone and internally synchronised; amounts are
//! persisted as decimal strings, never floats.

mod copy;
mod error;
mod schema;
mod store;
mod strategy;
mod types;

pub use error::StoreError;
pub use store::Store;
pub use types::{
    CopyTrade, CopyTradingSettings, NewCopyTrade, NewTrade, StrategyEvent, StrategyRow,
    TrackedUser, TradeRow,
};
