//! Full-text event search on the venue's search host.

use rate_limit::{RateLimiter, DEFAULT_ACQUIRE_TIMEOUT};
use rest_client::{with_retry, RestClient};
use serde::Deserialize;

use crate::fetcher::MetadataError;
use crate::gamma::GammaEvent;

/// The search host has no dedicated rate bucket; the limiter lets this
/// name pass unthrottled.
const SEARCH_BUCKET: &str = "search";

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    events: Vec<GammaEvent>,
}

/// Client for `GET /search`.
pub struct SearchClient {
    rest: RestClient,
    limiter: RateLimiter,
}

impl SearchClient {
    pub fn new(base_url: &str, limiter: RateLimiter) -> Result<Self, MetadataError> {
        Ok(Self {
            rest: RestClient::with_default_timeout(base_url)?,
            limiter,
        })
    }

    /// Events matching a free-text query.
    pub async fn search_events(
        &self,
        text: &str,
        limit: u32,
    ) -> Result<Vec<GammaEvent>, MetadataError> {
        self.limiter
            .acquire(SEARCH_BUCKET, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let encoded: String = text
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || "-_.~".contains(c) {
                    c.to_string()
                } else {
                    format!("%{:02X}", c as u32)
                }
            })
            .collect();
        let query = format!("text={encoded}&type=events&limit={limit}");
        let response = with_retry("/search", || {
            self.rest.get_json::<SearchResponse>("/search", Some(&query), &[])
        })
        .await?;
        Ok(response.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_tolerates_missing_fields() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.events.is_empty());

        let resp: SearchResponse = serde_json::from_str(
            r#"{"events": [{"title": "BTC hourly", "slug": "btc-hourly"}], "tags": []}"#,
        )
        .unwrap();
        assert_eq!(resp.events.len(), 1);
    }
}
