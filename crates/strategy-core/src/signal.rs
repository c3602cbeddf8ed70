//! Signals: what a module asks its runner to do.

use model::Side;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// The action of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
}

impl SignalAction {
    pub fn side(&self) -> Side {
        match self {
            Self::Buy => Side::Buy,
            Self::Sell => Side::Sell,
        }
    }
}

/// One trading decision from a strategy module.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub action: SignalAction,
    pub token_id: String,
    /// Limit price in dollars; the runner clamps to the tick grid before
    /// execution.
    pub price: Decimal,
    /// Size in shares.
    pub size: Decimal,
    /// Human-readable cause, logged with the signal event.
    pub reason: String,
    /// Free-form context for the event log and the UI.
    pub metadata: Value,
    /// SELL signals that must be backed by an existing position. The
    /// runner skips them with a warning when the position is too small.
    pub requires_position: bool,
}

impl Signal {
    pub fn buy(token_id: impl Into<String>, price: Decimal, size: Decimal, reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Buy,
            token_id: token_id.into(),
            price,
            size,
            reason: reason.into(),
            metadata: Value::Null,
            requires_position: false,
        }
    }

    pub fn sell(token_id: impl Into<String>, price: Decimal, size: Decimal, reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Sell,
            token_id: token_id.into(),
            price,
            size,
            reason: reason.into(),
            metadata: Value::Null,
            requires_position: true,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Notional value in dollars.
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn constructors_set_position_requirements() {
        let buy = Signal::buy("tok", dec!(0.96), dec!(10), "threshold crossed");
        assert!(!buy.requires_position);
        assert_eq!(buy.action.side(), Side::Buy);

        let sell = Signal::sell("tok", dec!(0.98), dec!(5), "take profit");
        assert!(sell.requires_position);
        assert_eq!(sell.notional(), dec!(4.90));
    }
}
