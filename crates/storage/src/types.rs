//! Persisted record types.

use model::{CopyTradeStatus, EventKind, Side, SizingMode, StrategyStatus, TradeStatus};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::StoreError;

/// Copy-trading configuration (singleton row).
#[derive(Debug, Clone, PartialEq)]
pub struct CopyTradingSettings {
    pub sizing_mode: SizingMode,
    /// Dollar amount per copy in `fixed` mode.
    pub fixed_amount: Decimal,
    /// Notional multiplier in `proportional` mode.
    pub proportional_factor: Decimal,
    /// Balance percentage in `percentage` mode, in `(0, 100]`.
    pub percentage: Decimal,
    pub enabled: bool,
}

impl Default for CopyTradingSettings {
    fn default() -> Self {
        Self {
            sizing_mode: SizingMode::Fixed,
            fixed_amount: Decimal::TEN,
            proportional_factor: Decimal::new(1, 1), // 0.1
            percentage: Decimal::ONE,
            enabled: false,
        }
    }
}

impl CopyTradingSettings {
    /// Every numeric field must be positive; percentage is capped at 100.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.fixed_amount <= Decimal::ZERO {
            return Err(invalid("fixed_amount", "must be positive"));
        }
        if self.proportional_factor <= Decimal::ZERO {
            return Err(invalid("proportional_factor", "must be positive"));
        }
        if self.percentage <= Decimal::ZERO || self.percentage > Decimal::ONE_HUNDRED {
            return Err(invalid("percentage", "must be in (0, 100]"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> StoreError {
    StoreError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// A wallet whose activity is mirrored.
#[derive(Debug, Clone)]
pub struct TrackedUser {
    pub address: String,
    pub label: String,
    /// `false` means archived; restore flips it back.
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for a new copy trade row.
#[derive(Debug, Clone)]
pub struct NewCopyTrade {
    pub source_address: String,
    /// Transaction hash of the source trade; unique across all rows.
    pub original_trade_id: String,
    pub market: String,
    pub asset_id: String,
    pub side: Side,
    pub original_size: Decimal,
    pub original_price: Decimal,
    pub copy_size: Decimal,
    pub status: CopyTradeStatus,
    pub error_message: Option<String>,
    pub title: String,
    pub outcome: String,
    pub event_slug: String,
}

/// A stored copy trade.
#[derive(Debug, Clone)]
pub struct CopyTrade {
    pub id: i64,
    pub source_address: String,
    pub original_trade_id: String,
    pub market: String,
    pub asset_id: String,
    pub side: Side,
    pub original_size: Decimal,
    pub original_price: Decimal,
    pub copy_size: Decimal,
    pub status: CopyTradeStatus,
    pub executed_at: Option<i64>,
    pub error_message: Option<String>,
    pub title: String,
    pub outcome: String,
    pub event_slug: String,
}

/// A configured strategy.
#[derive(Debug, Clone)]
pub struct StrategyRow {
    pub id: i64,
    pub name: String,
    /// Strategy type tag, e.g. `time_decay`.
    pub kind: String,
    pub config: Value,
    pub status: StrategyStatus,
    pub paper_mode: bool,
}

/// One entry of a strategy's append-only event log.
#[derive(Debug, Clone)]
pub struct StrategyEvent {
    pub id: i64,
    pub strategy_id: i64,
    pub kind: EventKind,
    pub message: String,
    pub metadata: Value,
    pub inserted_at: i64,
}

/// Input for a new strategy trade row.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub strategy_id: i64,
    pub market_id: String,
    pub asset_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub status: TradeStatus,
    pub title: String,
    pub outcome: String,
}

/// A stored strategy trade.
#[derive(Debug, Clone)]
pub struct TradeRow {
    pub id: i64,
    pub strategy_id: i64,
    pub market_id: String,
    pub asset_id: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub status: TradeStatus,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
    pub title: String,
    pub outcome: String,
    pub pnl: Option<Decimal>,
    pub inserted_at: i64,
}
