//! Gamma API wrapper: discovery and single-token lookup.

use chrono::Utc;
use model::{is_crypto_market, MarketInfo};
use rate_limit::{buckets, RateLimiter, DEFAULT_ACQUIRE_TIMEOUT};
use rest_client::{with_retry, RestClient, RestError};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::cache::MarketCache;
use crate::gamma::{GammaEvent, GammaMarket};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    RateLimit(#[from] rate_limit::RateLimitError),

    #[error("token {0} not found on the gamma API")]
    TokenNotFound(String),
}

/// Time-to-resolution tags the venue exposes for short-lived markets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionTag {
    FifteenMinutes,
    OneHour,
    FourHours,
    Weekly,
}

impl ResolutionTag {
    /// The venue's tag slug, preserving its inconsistent casing.
    pub fn tag_slug(&self) -> &'static str {
        match self {
            Self::FifteenMinutes => "15M",
            Self::OneHour => "1H",
            Self::FourHours => "4h",
            Self::Weekly => "weekly",
        }
    }

    /// Resolution window in minutes: `(min, max)`.
    pub fn window_minutes(&self) -> (i64, i64) {
        match self {
            Self::FifteenMinutes => (0, 15),
            Self::OneHour => (0, 60),
            Self::FourHours => (0, 240),
            Self::Weekly => (0, 7 * 24 * 60),
        }
    }

    /// Parse a config value (`15m`, `1h`, `4h`, `weekly`).
    pub fn from_config(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "15m" => Some(Self::FifteenMinutes),
            "1h" => Some(Self::OneHour),
            "4h" => Some(Self::FourHours),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }
}

/// One tradable token surfaced by discovery.
#[derive(Debug, Clone)]
pub struct DiscoveredToken {
    pub token_id: String,
    pub info: MarketInfo,
}

/// Thin wrapper over the Gamma endpoints.
pub struct MetadataFetcher {
    rest: RestClient,
    limiter: RateLimiter,
    cache: MarketCache,
}

impl MetadataFetcher {
    pub fn new(base_url: &str, limiter: RateLimiter, cache: MarketCache) -> Result<Self, MetadataError> {
        Ok(Self {
            rest: RestClient::with_default_timeout(base_url)?,
            limiter,
            cache,
        })
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    /// Events carrying a resolution tag, filtered client-side.
    pub async fn events_by_tag(
        &self,
        tag: ResolutionTag,
        min_minutes: i64,
        max_minutes: i64,
        crypto_only: bool,
    ) -> Result<Vec<GammaEvent>, MetadataError> {
        self.limiter
            .acquire(buckets::GAMMA, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let query = format!(
            "closed=false&active=true&limit=100&offset=0&order=volume24hr&ascending=false&tag_slug={}",
            tag.tag_slug()
        );
        let events = with_retry("/events", || {
            self.rest.get_json::<Vec<GammaEvent>>("/events", Some(&query), &[])
        })
        .await?;

        let now = Utc::now();
        let filtered: Vec<GammaEvent> = events
            .into_iter()
            .filter(|event| {
                let minutes = event
                    .end_date
                    .map(|end| (end - now).num_minutes())
                    .unwrap_or(i64::MAX);
                if minutes < min_minutes || minutes > max_minutes {
                    return false;
                }
                if crypto_only && !is_crypto_market(&event.title) {
                    return false;
                }
                event.markets.iter().any(|m| m.enable_order_book)
            })
            .collect();

        debug!(tag = tag.tag_slug(), events = filtered.len(), "tag discovery");
        Ok(filtered)
    }

    /// Combined discovery over several tags: query each, de-duplicate by
    /// event slug, sort by end date, and flatten into tokens. Market info
    /// for every surfaced token is cached with the standard TTL.
    pub async fn discover(
        &self,
        tags: &[ResolutionTag],
        crypto_only: bool,
    ) -> Result<Vec<DiscoveredToken>, MetadataError> {
        let mut events: Vec<GammaEvent> = Vec::new();
        for tag in tags {
            let (min, max) = tag.window_minutes();
            let batch = self.events_by_tag(*tag, min, max, crypto_only).await?;
            for event in batch {
                if !events.iter().any(|e| e.slug == event.slug) {
                    events.push(event);
                }
            }
        }
        events.sort_by_key(|e| e.end_date);

        let mut tokens = Vec::new();
        for event in &events {
            for market in &event.markets {
                if !market.enable_order_book {
                    continue;
                }
                for token_id in &market.clob_token_ids {
                    if let Some(info) = market_info_for_token(event, market, token_id) {
                        self.cache.insert(token_id.clone(), info.clone());
                        tokens.push(DiscoveredToken {
                            token_id: token_id.clone(),
                            info,
                        });
                    }
                }
            }
        }
        Ok(tokens)
    }

    /// One event by its slug.
    pub async fn event_by_slug(&self, slug: &str) -> Result<GammaEvent, MetadataError> {
        self.limiter
            .acquire(buckets::GAMMA, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let path = format!("/events/slug/{slug}");
        let event = with_retry(&path, || self.rest.get_json::<GammaEvent>(&path, None, &[])).await?;
        Ok(event)
    }

    /// Market info for one token: cached when fresh, otherwise fetched
    /// from `GET /markets?clob_token_ids=…` and cached for 300 s.
    pub async fn token_info(&self, token_id: &str) -> Result<MarketInfo, MetadataError> {
        if let Some(info) = self.cache.lookup(token_id) {
            return Ok(info);
        }

        self.limiter
            .acquire(buckets::GAMMA, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let query = format!("clob_token_ids={token_id}");
        let markets = with_retry("/markets", || {
            self.rest.get_json::<Vec<GammaMarket>>("/markets", Some(&query), &[])
        })
        .await?;

        let info = markets
            .iter()
            .find_map(|market| standalone_market_info(market, token_id))
            .ok_or_else(|| MetadataError::TokenNotFound(token_id.to_string()))?;

        self.cache.insert(token_id.to_string(), info.clone());
        Ok(info)
    }
}

/// Build market info for a token inside a discovered event.
fn market_info_for_token(
    event: &GammaEvent,
    market: &GammaMarket,
    token_id: &str,
) -> Option<MarketInfo> {
    let idx = market.token_index(token_id)?;
    Some(MarketInfo {
        question: market.question.clone(),
        event_title: event.title.clone(),
        event_slug: event.slug.clone(),
        condition_id: market.condition_id.clone(),
        outcome: market.outcomes.get(idx).cloned().unwrap_or_default(),
        opposite_token_id: market.opposite_token(token_id).map(str::to_string),
        price: market
            .outcome_prices
            .get(idx)
            .and_then(|p| p.parse::<Decimal>().ok()),
        end_date: market.end_date.or(event.end_date),
        neg_risk: market.neg_risk,
    })
}

/// Build market info from a bare `/markets` row (no surrounding event).
fn standalone_market_info(market: &GammaMarket, token_id: &str) -> Option<MarketInfo> {
    let idx = market.token_index(token_id)?;
    Some(MarketInfo {
        question: market.question.clone(),
        event_title: market.question.clone(),
        event_slug: market.slug.clone(),
        condition_id: market.condition_id.clone(),
        outcome: market.outcomes.get(idx).cloned().unwrap_or_default(),
        opposite_token_id: market.opposite_token(token_id).map(str::to_string),
        price: market
            .outcome_prices
            .get(idx)
            .and_then(|p| p.parse::<Decimal>().ok()),
        end_date: market.end_date,
        neg_risk: market.neg_risk,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market_json() -> GammaMarket {
        serde_json::from_str(
            r#"{
                "question": "Bitcoin above $100k at 3pm?",
                "conditionId": "0xcond",
                "slug": "btc-100k-3pm",
                "endDate": "2025-06-01T15:00:00Z",
                "enableOrderBook": true,
                "negRisk": false,
                "clobTokenIds": "[\"10\", \"20\"]",
                "outcomes": "[\"Yes\", \"No\"]",
                "outcomePrices": "[\"0.62\", \"0.38\"]"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn standalone_info_derives_outcome_by_index() {
        let market = market_json();

        let yes = standalone_market_info(&market, "10").unwrap();
        assert_eq!(yes.outcome, "Yes");
        assert_eq!(yes.price, Some(dec!(0.62)));
        assert_eq!(yes.opposite_token_id.as_deref(), Some("20"));

        let no = standalone_market_info(&market, "20").unwrap();
        assert_eq!(no.outcome, "No");
        assert_eq!(no.price, Some(dec!(0.38)));
        assert_eq!(no.opposite_token_id.as_deref(), Some("10"));
    }

    #[test]
    fn unknown_token_yields_nothing() {
        assert!(standalone_market_info(&market_json(), "99").is_none());
    }

    #[test]
    fn resolution_tags_parse_from_config() {
        assert_eq!(ResolutionTag::from_config("15m"), Some(ResolutionTag::FifteenMinutes));
        assert_eq!(ResolutionTag::from_config("1H"), Some(ResolutionTag::OneHour));
        assert_eq!(ResolutionTag::from_config("4h"), Some(ResolutionTag::FourHours));
        assert_eq!(ResolutionTag::from_config("weekly"), Some(ResolutionTag::Weekly));
        assert_eq!(ResolutionTag::from_config("daily"), None);
    }

    #[test]
    fn tag_slugs_keep_venue_casing() {
        assert_eq!(ResolutionTag::FifteenMinutes.tag_slug(), "15M");
        assert_eq!(ResolutionTag::OneHour.tag_slug(), "1H");
        assert_eq!(ResolutionTag::FourHours.tag_slug(), "4h");
        assert_eq!(ResolutionTag::Weekly.tag_slug(), "weekly");
    }
}
