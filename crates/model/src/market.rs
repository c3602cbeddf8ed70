//! Cached market metadata and the crypto-market heuristic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalised metadata for one outcome token of a binary market.
///
/// For a two-outcome market `token_id` and `opposite_token_id` are
/// reciprocal: looking up the opposite token yields this token as its
/// opposite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub question: String,
    pub event_title: String,
    pub event_slug: String,
    pub condition_id: String,
    /// Outcome label of the token this record describes.
    pub outcome: String,
    /// The other leg of the binary market.
    pub opposite_token_id: Option<String>,
    /// Last known price of this token.
    pub price: Option<Decimal>,
    pub end_date: Option<DateTime<Utc>>,
    /// Settlement mode flag; selects the verifying contract when signing.
    /// `None` means the venue did not report it and orders must be refused.
    pub neg_risk: Option<bool>,
}

impl MarketInfo {
    /// Minutes until resolution, or `None` when the end date is unknown.
    /// Negative values mean the market has already passed its end date.
    pub fn minutes_to_resolution(&self, now: DateTime<Utc>) -> Option<i64> {
        self.end_date.map(|end| (end - now).num_minutes())
    }

    /// Whether the market text matches the crypto keyword set.
    pub fn is_crypto(&self) -> bool {
        is_crypto_market(&self.question) || is_crypto_market(&self.event_title)
    }
}

/// Closed keyword set used for heuristic crypto-market filtering.
pub const CRYPTO_KEYWORDS: &[&str] = &[
    "bitcoin",
    "btc",
    "ethereum",
    "eth",
    "crypto",
    "solana",
    "sol",
    "xrp",
    "doge",
    "dogecoin",
    "bnb",
    "cardano",
    "ada",
    "polygon",
    "matic",
    "avalanche",
    "avax",
    "chainlink",
    "link",
    "uniswap",
    "uni",
];

/// Keyword match on whole words only, so "solid" does not match "sol".
pub fn is_crypto_market(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| CRYPTO_KEYWORDS.contains(&word))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn info(question: &str, end: Option<DateTime<Utc>>) -> MarketInfo {
        MarketInfo {
            question: question.to_string(),
            event_title: String::new(),
            event_slug: String::new(),
            condition_id: "0xcond".to_string(),
            outcome: "Yes".to_string(),
            opposite_token_id: Some("999".to_string()),
            price: Some(dec!(0.5)),
            end_date: end,
            neg_risk: Some(false),
        }
    }

    #[test]
    fn crypto_keywords_match_whole_words() {
        assert!(is_crypto_market("Will Bitcoin close above $100k?"));
        assert!(is_crypto_market("ETH up or down - 3pm ET"));
        assert!(is_crypto_market("solana above $200?"));
        assert!(!is_crypto_market("Will the solidarity march happen?"));
        assert!(!is_crypto_market("Links of London to close?"));
    }

    #[test]
    fn minutes_to_resolution_counts_down() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 12, 45, 0).unwrap();

        let m = info("Will it rain?", Some(end));
        assert_eq!(m.minutes_to_resolution(now), Some(45));

        let past = info("Will it rain?", Some(now - chrono::Duration::minutes(5)));
        assert_eq!(past.minutes_to_resolution(now), Some(-5));

        assert_eq!(info("Will it rain?", None).minutes_to_resolution(now), None);
    }
}
