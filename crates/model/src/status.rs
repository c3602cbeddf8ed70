//! Order sides and the persisted status enums.

use serde::{Deserialize, Serialize};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_venue_str(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Self::Buy),
            "SELL" => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_venue_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    /// Integer encoding used in the signed order struct (BUY=0, SELL=1).
    pub fn as_wire_code(&self) -> u8 {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Which outcome leg a position is held in.
///
/// BUY entries open `Yes` positions, SELL entries open `No` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Yes,
    No,
}

impl PositionSide {
    pub fn for_entry(side: Side) -> Self {
        match side {
            Side::Buy => Self::Yes,
            Side::Sell => Self::No,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "YES" => Some(Self::Yes),
            "NO" => Some(Self::No),
            _ => None,
        }
    }
}

/// How a copied order is sized from the source trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    /// A fixed dollar amount per copy.
    Fixed,
    /// Source notional scaled by a factor.
    Proportional,
    /// A percentage of the account balance.
    Percentage,
}

impl SizingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Proportional => "proportional",
            Self::Percentage => "percentage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "proportional" => Some(Self::Proportional),
            "percentage" => Some(Self::Percentage),
            _ => None,
        }
    }
}

/// Lifecycle of a copy trade row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyTradeStatus {
    Pending,
    Executed,
    Simulated,
    Failed,
}

impl CopyTradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Simulated => "simulated",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "executed" => Some(Self::Executed),
            "simulated" => Some(Self::Simulated),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Lifecycle of a strategy trade row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Submitted,
    Filled,
    Failed,
    Simulated,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Filled => "filled",
            Self::Failed => "failed",
            Self::Simulated => "simulated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "filled" => Some(Self::Filled),
            "failed" => Some(Self::Failed),
            "simulated" => Some(Self::Simulated),
            _ => None,
        }
    }
}

/// Persisted intent of a strategy.
///
/// The engine registry, not this field, is the authority on whether a
/// runner is actually alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyStatus {
    Stopped,
    Running,
    Paused,
    Error,
}

impl StrategyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "stopped" => Some(Self::Stopped),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Kind of an entry in a strategy's append-only event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Signal,
    Trade,
    Error,
    Warning,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Signal => "signal",
            Self::Trade => "trade",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "signal" => Some(Self::Signal),
            "trade" => Some(Self::Trade),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_round_trips() {
        assert_eq!(Side::from_venue_str("BUY"), Some(Side::Buy));
        assert_eq!(Side::from_venue_str("SELL"), Some(Side::Sell));
        assert_eq!(Side::from_venue_str("HOLD"), None);
        assert_eq!(Side::Buy.as_wire_code(), 0);
        assert_eq!(Side::Sell.as_wire_code(), 1);
        assert_eq!(Side::Buy.opposite(), Side::Sell);
    }

    #[test]
    fn entry_side_maps_to_outcome_leg() {
        assert_eq!(PositionSide::for_entry(Side::Buy), PositionSide::Yes);
        assert_eq!(PositionSide::for_entry(Side::Sell), PositionSide::No);
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [
            TradeStatus::Pending,
            TradeStatus::Submitted,
            TradeStatus::Filled,
            TradeStatus::Failed,
            TradeStatus::Simulated,
        ] {
            assert_eq!(TradeStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(StrategyStatus::from_str("running"), Some(StrategyStatus::Running));
        assert_eq!(SizingMode::from_str("percentage"), Some(SizingMode::Percentage));
        assert_eq!(CopyTradeStatus::from_str("bogus"), None);
    }
}
