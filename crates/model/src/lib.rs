//! Shared domain types for the trading server.
//!
//! Everything that crosses a crate boundary lives here: order sides, the
//! persisted status enums, activity trades from the public data API, cached
//! market metadata, and position arithmetic.

mod activity;
mod market;
mod position;
mod status;

pub use activity::ActivityTrade;
pub use market::{is_crypto_market, MarketInfo, CRYPTO_KEYWORDS};
pub use position::Position;
pub use status::{
    CopyTradeStatus, EventKind, PositionSide, Side, SizingMode, StrategyStatus, TradeStatus,
};
