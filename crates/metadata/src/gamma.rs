//! Gamma API response shapes.
//!
//! `clobTokenIds`, `outcomes` and `outcomePrices` arrive either as JSON
//! arrays or as JSON-encoded strings depending on the endpoint; both
//! shapes are accepted.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::Deserialize;

/// An event with its markets.
#[derive(Debug, Clone, Deserialize)]
pub struct GammaEvent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub markets: Vec<GammaMarket>,
}

/// One market inside an event.
#[derive(Debug, Clone, Deserialize)]
pub struct GammaMarket {
    #[serde(default)]
    pub question: String,
    #[serde(rename = "conditionId", default)]
    pub condition_id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "endDate", default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(rename = "enableOrderBook", default)]
    pub enable_order_book: bool,
    #[serde(rename = "negRisk", default)]
    pub neg_risk: Option<bool>,
    #[serde(rename = "clobTokenIds", default, deserialize_with = "string_list")]
    pub clob_token_ids: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub outcomes: Vec<String>,
    #[serde(rename = "outcomePrices", default, deserialize_with = "string_list")]
    pub outcome_prices: Vec<String>,
}

impl GammaMarket {
    /// Index of a token within this market, if it belongs here.
    pub fn token_index(&self, token_id: &str) -> Option<usize> {
        self.clob_token_ids.iter().position(|t| t == token_id)
    }

    /// The other leg of a binary market.
    pub fn opposite_token(&self, token_id: &str) -> Option<&str> {
        let idx = self.token_index(token_id)?;
        let other = if idx == 0 { 1 } else { 0 };
        self.clob_token_ids.get(other).map(String::as_str)
    }
}

/// Accept `["a","b"]`, `"[\"a\",\"b\"]"` or `"a,b"`.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Raw::List(list)) => list,
        Some(Raw::Text(text)) => parse_string_list(&text),
    })
}

fn parse_string_list(text: &str) -> Vec<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(text) {
        return list;
    }
    text.split(',')
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_ids_accept_both_shapes() {
        let as_array: GammaMarket = serde_json::from_str(
            r#"{"question": "Q?", "clobTokenIds": ["1", "2"]}"#,
        )
        .unwrap();
        assert_eq!(as_array.clob_token_ids, vec!["1", "2"]);

        let as_string: GammaMarket = serde_json::from_str(
            r#"{"question": "Q?", "clobTokenIds": "[\"1\", \"2\"]"}"#,
        )
        .unwrap();
        assert_eq!(as_string.clob_token_ids, vec!["1", "2"]);
    }

    #[test]
    fn comma_separated_fallback() {
        assert_eq!(parse_string_list("1, 2"), vec!["1", "2"]);
        assert_eq!(parse_string_list(""), Vec::<String>::new());
    }

    #[test]
    fn opposite_token_is_reciprocal() {
        let market: GammaMarket = serde_json::from_str(
            r#"{"question": "Q?", "clobTokenIds": ["10", "20"],
                "outcomes": "[\"Yes\", \"No\"]", "outcomePrices": "[\"0.6\", \"0.4\"]"}"#,
        )
        .unwrap();

        assert_eq!(market.opposite_token("10"), Some("20"));
        assert_eq!(market.opposite_token("20"), Some("10"));
        assert_eq!(market.opposite_token("30"), None);
        assert_eq!(market.token_index("20"), Some(1));
    }

    #[test]
    fn event_parses_with_nested_markets() {
        let event: GammaEvent = serde_json::from_str(
            r#"{
                "title": "BTC hourly",
                "slug": "btc-hourly",
                "endDate": "2025-06-01T13:00:00Z",
                "markets": [{"question": "Up?", "enableOrderBook": true,
                             "clobTokenIds": ["1", "2"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(event.markets.len(), 1);
        assert!(event.markets[0].enable_order_book);
        assert!(event.end_date.is_some());
    }
}
