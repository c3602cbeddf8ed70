//! Position arithmetic for strategy holdings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PositionSide, Side};

/// A strategy's holding in one outcome token.
///
/// Unique per `(strategy_id, token_id)`. The average price is size-weighted
/// over BUY fills only; SELL fills reduce size without touching it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub strategy_id: i64,
    pub token_id: String,
    pub side: PositionSide,
    /// Held size in shares; never negative.
    pub size: Decimal,
    /// Size-weighted average entry price over BUYs.
    pub avg_price: Decimal,
    /// Last observed market price, for unrealised PnL display.
    pub current_price: Decimal,
}

impl Position {
    /// Open a fresh position from the first fill.
    pub fn open(strategy_id: i64, token_id: impl Into<String>, side: Side, size: Decimal, price: Decimal) -> Self {
        Self {
            strategy_id,
            token_id: token_id.into(),
            side: PositionSide::for_entry(side),
            size,
            avg_price: price,
            current_price: price,
        }
    }

    /// Apply a BUY fill: size grows, average price re-weights.
    pub fn apply_buy(&mut self, size: Decimal, price: Decimal) {
        if size <= Decimal::ZERO {
            return;
        }
        let old_cost = self.size * self.avg_price;
        let new_total = self.size + size;
        self.avg_price = (old_cost + size * price) / new_total;
        self.size = new_total;
        self.current_price = price;
    }

    /// Apply a SELL fill: size shrinks (floored at zero), average price
    /// stays put.
    pub fn apply_sell(&mut self, size: Decimal, price: Decimal) {
        if size <= Decimal::ZERO {
            return;
        }
        self.size = (self.size - size).max(Decimal::ZERO);
        self.current_price = price;
    }

    pub fn is_flat(&self) -> bool {
        self.size == Decimal::ZERO
    }

    /// Unrealised PnL at the last observed price.
    pub fn unrealized_pnl(&self) -> Decimal {
        (self.current_price - self.avg_price) * self.size
    }
}
