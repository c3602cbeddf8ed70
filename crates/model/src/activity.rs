//! Canonical trade records extracted from the public activity endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Side;

/// One trade performed by a tracked wallet, projected from the data API's
/// activity feed. The transaction hash doubles as the stable identity used
/// for de-duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTrade {
    /// Transaction hash; unique per on-venue fill.
    pub id: String,
    /// Wallet that performed the trade (lowercased hex).
    pub address: String,
    /// Condition id of the market.
    pub market: String,
    /// ERC-1155 token id of the traded outcome.
    pub asset_id: String,
    pub side: Side,
    /// Size in outcome shares.
    pub size: Decimal,
    /// Price per share in dollars.
    pub price: Decimal,
    /// Outcome label ("Yes" / "No").
    pub outcome: String,
    /// Market question shown in the UI.
    pub title: String,
    pub event_slug: String,
    /// Unix seconds of the fill.
    pub timestamp: i64,
}

impl ActivityTrade {
    /// Notional value of the source trade in dollars.
    pub fn notional(&self) -> Decimal {
        self.size * self.price
    }
}
