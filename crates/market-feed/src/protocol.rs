//! Wire protocol of the market WebSocket.

use model::MarketInfo;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Control strings the venue sends as bare text frames.
pub const NO_NEW_ASSETS: &str = "NO NEW ASSETS";
pub const INVALID_OPERATION: &str = "INVALID OPERATION";

/// Subscription request.
///
/// Both `assets_ids` and `asset_ids` are sent: the venue historically
/// accepted the misspelled key, and which one it canonically honours is
/// unclear, so both stay in for forward compatibility.
#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    pub operation: &'static str,
    #[serde(rename = "type")]
    pub channel: &'static str,
    pub assets_ids: &'a [String],
    pub asset_ids: &'a [String],
}

impl<'a> SubscribeRequest<'a> {
    pub fn market(tokens: &'a [String]) -> Self {
        Self {
            operation: "subscribe",
            channel: "market",
            assets_ids: tokens,
            asset_ids: tokens,
        }
    }
}

/// A parsed event delivered to in-process subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    Trade(FeedTrade),
    PriceChange(PriceChange),
}

impl FeedEvent {
    pub fn asset_id(&self) -> &str {
        match self {
            Self::Trade(t) => &t.asset_id,
            Self::PriceChange(p) => &p.asset_id,
        }
    }
}

/// A `last_trade_price` event, enriched from the market cache when the
/// token is known there.
#[derive(Debug, Clone, Serialize)]
pub struct FeedTrade {
    pub asset_id: String,
    pub price: Option<Decimal>,
    pub size: Option<Decimal>,
    pub side: Option<String>,
    pub timestamp: Option<i64>,
    pub outcome: String,
    pub market_question: String,
    pub event_title: String,
}

/// A top-of-book move, from `price_change` entries or `book` snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PriceChange {
    pub asset_id: String,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub price: Option<Decimal>,
    pub size: Option<Decimal>,
    pub side: Option<String>,
}

// ---------------------------------------------------------------------
// Raw message shapes
// ---------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    event_type: String,
    #[serde(default)]
    asset_id: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, alias = "changes")]
    price_changes: Option<Vec<RawPriceChange>>,
    #[serde(default)]
    bids: Vec<RawLevel>,
    #[serde(default)]
    asks: Vec<RawLevel>,
}

#[derive(Debug, Deserialize)]
struct RawPriceChange {
    #[serde(default)]
    asset_id: String,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    best_bid: Option<String>,
    #[serde(default)]
    best_ask: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLevel {
    price: String,
    #[allow(dead_code)]
    #[serde(default)]
    size: String,
}

/// Outcome of parsing one text frame.
#[derive(Debug, Default)]
pub struct ParsedFrame {
    pub events: Vec<FeedEvent>,
    /// `tick_size_change` and the control strings are log-only.
    pub ignored: usize,
}

/// Parse one text frame into events. `lookup` resolves cached market info
/// for trade enrichment.
pub fn parse_frame(text: &str, lookup: &dyn Fn(&str) -> Option<MarketInfo>) -> ParsedFrame {
    let trimmed = text.trim();
    let mut out = ParsedFrame::default();

    if trimmed == NO_NEW_ASSETS || trimmed == INVALID_OPERATION {
        tracing::debug!(control = %trimmed, "control frame");
        out.ignored += 1;
        return out;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable frame");
            out.ignored += 1;
            return out;
        }
    };

    match value {
        Value::Array(items) => {
            for item in items {
                parse_object(item, lookup, &mut out);
            }
        }
        other => parse_object(other, lookup, &mut out),
    }
    out
}

fn parse_object(value: Value, lookup: &dyn Fn(&str) -> Option<MarketInfo>, out: &mut ParsedFrame) {
    let raw: RawMessage = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "malformed event object");
            out.ignored += 1;
            return;
        }
    };

    match raw.event_type.as_str() {
        "last_trade_price" => {
            let info = lookup(&raw.asset_id);
            out.events.push(FeedEvent::Trade(FeedTrade {
                asset_id: raw.asset_id,
                price: parse_dec(raw.price.as_deref()),
                size: parse_dec(raw.size.as_deref()),
                side: raw.side,
                timestamp: raw.timestamp.and_then(|t| t.parse().ok()),
                outcome: info.as_ref().map(|i| i.outcome.clone()).unwrap_or_default(),
                market_question: info.as_ref().map(|i| i.question.clone()).unwrap_or_default(),
                event_title: info.map(|i| i.event_title).unwrap_or_default(),
            }));
        }
        "price_change" => {
            for change in raw.price_changes.unwrap_or_default() {
                let best_bid = parse_dec(change.best_bid.as_deref());
                let best_ask = parse_dec(change.best_ask.as_deref());
                let price = parse_dec(change.price.as_deref());
                // Entries carrying no price information at all are noise.
                if best_bid.is_none() && best_ask.is_none() && price.is_none() {
                    out.ignored += 1;
                    continue;
                }
                out.events.push(FeedEvent::PriceChange(PriceChange {
                    asset_id: change.asset_id,
                    best_bid,
                    best_ask,
                    price,
                    size: parse_dec(change.size.as_deref()),
                    side: change.side,
                }));
            }
        }
        "book" => {
            let best_bid = raw
                .bids
                .iter()
                .filter_map(|l| l.price.parse::<Decimal>().ok())
                .max();
            let best_ask = raw
                .asks
                .iter()
                .filter_map(|l| l.price.parse::<Decimal>().ok())
                .min();
            out.events.push(FeedEvent::PriceChange(PriceChange {
                asset_id: raw.asset_id,
                best_bid,
                best_ask,
                price: None,
                size: None,
                side: None,
            }));
        }
        "tick_size_change" => {
            tracing::debug!(asset_id = %raw.asset_id, "tick size change");
            out.ignored += 1;
        }
        other => {
            tracing::trace!(event_type = %other, "ignored event type");
            out.ignored += 1;
        }
    }
}

fn parse_dec(s: Option<&str>) -> Option<Decimal> {
    s.and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn no_lookup(_: &str) -> Option<MarketInfo> {
        None
    }

    #[test]
    fn control_strings_are_ignored() {
        let parsed = parse_frame("NO NEW ASSETS", &no_lookup);
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.ignored, 1);

        let parsed = parse_frame("INVALID OPERATION", &no_lookup);
        assert!(parsed.events.is_empty());
    }

    #[test]
    fn last_trade_price_parses() {
        let frame = r#"{"event_type": "last_trade_price", "asset_id": "123",
                        "price": "0.62", "size": "15", "side": "BUY",
                        "timestamp": "1700000000"}"#;
        let parsed = parse_frame(frame, &no_lookup);
        assert_eq!(parsed.events.len(), 1);
        match &parsed.events[0] {
            FeedEvent::Trade(t) => {
                assert_eq!(t.asset_id, "123");
                assert_eq!(t.price, Some(dec!(0.62)));
                assert_eq!(t.timestamp, Some(1_700_000_000));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn price_change_batches_and_drops_empty_entries() {
        let frame = r#"{"event_type": "price_change", "price_changes": [
            {"asset_id": "1", "best_bid": "0.40", "best_ask": "0.42"},
            {"asset_id": "2"},
            {"asset_id": "3", "price": "0.55", "size": "10", "side": "SELL"}
        ]}"#;
        let parsed = parse_frame(frame, &no_lookup);
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.ignored, 1);
        assert_eq!(parsed.events[0].asset_id(), "1");
        assert_eq!(parsed.events[1].asset_id(), "3");
    }

    #[test]
    fn book_snapshot_derives_top_of_book() {
        let frame = r#"{"event_type": "book", "asset_id": "7",
            "bids": [{"price": "0.44", "size": "5"}, {"price": "0.45", "size": "9"}],
            "asks": [{"price": "0.48", "size": "2"}, {"price": "0.47", "size": "1"}]}"#;
        let parsed = parse_frame(frame, &no_lookup);
        match &parsed.events[0] {
            FeedEvent::PriceChange(p) => {
                assert_eq!(p.best_bid, Some(dec!(0.45)));
                assert_eq!(p.best_ask, Some(dec!(0.47)));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn arrays_of_events_flatten() {
        let frame = r#"[
            {"event_type": "last_trade_price", "asset_id": "1", "price": "0.5"},
            {"event_type": "tick_size_change", "asset_id": "1"},
            {"event_type": "mystery", "asset_id": "1"}
        ]"#;
        let parsed = parse_frame(frame, &no_lookup);
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.ignored, 2);
    }

    #[test]
    fn subscribe_payload_carries_both_key_spellings() {
        let tokens = vec!["1".to_string(), "2".to_string()];
        let payload = serde_json::to_value(SubscribeRequest::market(&tokens)).unwrap();
        assert_eq!(payload["operation"], "subscribe");
        assert_eq!(payload["type"], "market");
        assert_eq!(payload["assets_ids"], payload["asset_ids"]);
    }
}
