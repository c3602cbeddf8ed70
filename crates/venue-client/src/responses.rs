//! Venue API response types.
//!
//! The venue is inconsistent about numeric encodings: prices and sizes
//! arrive as JSON strings on some endpoints and numbers on others, so
//! decimal fields deserialize through a flexible helper.

use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::Deserialize;

/// One price level of a book snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct BookLevel {
    #[serde(deserialize_with = "decimal_flexible")]
    pub price: Decimal,
    #[serde(deserialize_with = "decimal_flexible")]
    pub size: Decimal,
}

/// Response of `GET /book?token_id=…`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookResponse {
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
    /// Settlement mode; absence means orders on this market are refused.
    #[serde(default)]
    pub neg_risk: Option<bool>,
}

impl BookResponse {
    /// Highest bid, if any liquidity exists.
    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.iter().map(|l| l.price).max()
    }

    /// Lowest ask, if any liquidity exists.
    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.iter().map(|l| l.price).min()
    }
}

/// Response of `GET /balance-allowance`.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceAllowanceResponse {
    /// Micro-USDC: divide by 10^6 for dollars.
    #[serde(deserialize_with = "decimal_flexible")]
    pub balance: Decimal,
}

/// Response of `POST /order`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostOrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "errorMsg", default)]
    pub error_msg: String,
    #[serde(rename = "orderID", default)]
    pub order_id: String,
    #[serde(default)]
    pub status: String,
}

/// One of the operator's own fills, from `GET /data/trades`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClobTrade {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub asset_id: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "decimal_flexible_opt")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal_flexible_opt")]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub status: String,
}

/// One entry of the data API activity feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityItem {
    /// Entry kind; only `TRADE` rows become activity trades.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "transactionHash", default)]
    pub transaction_hash: String,
    #[serde(rename = "conditionId", default)]
    pub condition_id: String,
    /// Token id of the traded outcome.
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub side: String,
    #[serde(default, deserialize_with = "decimal_flexible_opt")]
    pub size: Option<Decimal>,
    #[serde(default, deserialize_with = "decimal_flexible_opt")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "eventSlug", default)]
    pub event_slug: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// One entry of `GET /positions` on the data API.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPosition {
    #[serde(default)]
    pub asset: String,
    #[serde(rename = "conditionId", default)]
    pub condition_id: String,
    #[serde(default, deserialize_with = "decimal_flexible_opt")]
    pub size: Option<Decimal>,
    #[serde(rename = "avgPrice", default, deserialize_with = "decimal_flexible_opt")]
    pub avg_price: Option<Decimal>,
    #[serde(rename = "curPrice", default, deserialize_with = "decimal_flexible_opt")]
    pub cur_price: Option<Decimal>,
    #[serde(rename = "currentValue", default, deserialize_with = "decimal_flexible_opt")]
    pub current_value: Option<Decimal>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub outcome: String,
}

/// Accept a decimal encoded as string or number.
pub(crate) fn decimal_flexible<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s
            .parse()
            .map_err(|_| de::Error::custom(format!("bad decimal string: {s}"))),
        Raw::Num(n) => Decimal::from_f64_retain(n)
            .ok_or_else(|| de::Error::custom(format!("bad decimal number: {n}"))),
    }
}

pub(crate) fn decimal_flexible_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(f64),
        None,
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::None) => Ok(None),
        Some(Raw::Str(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("bad decimal string: {s}"))),
        Some(Raw::Num(n)) => Decimal::from_f64_retain(n)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("bad decimal number: {n}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn book_parses_and_derives_top_of_book() {
        let book: BookResponse = serde_json::from_str(
            r#"{
                "market": "0xcond",
                "asset_id": "123",
                "bids": [{"price": "0.45", "size": "100"}, {"price": "0.44", "size": "50"}],
                "asks": [{"price": "0.47", "size": "80"}, {"price": "0.48", "size": "10"}],
                "neg_risk": true
            }"#,
        )
        .unwrap();

        assert_eq!(book.best_bid(), Some(dec!(0.45)));
        assert_eq!(book.best_ask(), Some(dec!(0.47)));
        assert_eq!(book.neg_risk, Some(true));
    }

    #[test]
    fn book_without_neg_risk_parses_as_unknown() {
        let book: BookResponse =
            serde_json::from_str(r#"{"bids": [], "asks": []}"#).unwrap();
        assert_eq!(book.neg_risk, None);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn activity_accepts_numeric_and_string_amounts() {
        let item: ActivityItem = serde_json::from_str(
            r#"{
                "type": "TRADE",
                "transactionHash": "0xhash1",
                "conditionId": "0xcond",
                "asset": "123",
                "side": "BUY",
                "size": 20.5,
                "price": "0.91",
                "outcome": "Yes",
                "title": "Will it?",
                "eventSlug": "will-it",
                "timestamp": 1700000000
            }"#,
        )
        .unwrap();

        assert_eq!(item.kind, "TRADE");
        assert_eq!(item.size, Some(dec!(20.5)));
        assert_eq!(item.price, Some(dec!(0.91)));
    }

    #[test]
    fn post_order_response_defaults_are_safe() {
        let resp: PostOrderResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(resp.success);
        assert!(resp.order_id.is_empty());
    }
}
