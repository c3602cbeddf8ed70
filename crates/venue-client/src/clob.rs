//! Client for the exchange (CLOB) host.

use auth::RequestSigner;
use rate_limit::{buckets, RateLimiter, DEFAULT_ACQUIRE_TIMEOUT};
use rest_client::{with_retry, RestClient};
use rust_decimal::Decimal;
use storage::Store;
use tracing::warn;

use order_signer::OrderRequest;

use crate::error::VenueError;
use crate::responses::{BalanceAllowanceResponse, BookResponse, ClobTrade, PostOrderResponse};

const MICRO_USDC: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Exchange host client.
///
/// Credentials are read from the store on every signed request, so an
/// operator updating keys takes effect immediately without restarts.
pub struct ClobClient {
    rest: RestClient,
    store: Store,
    limiter: RateLimiter,
}

impl ClobClient {
    pub fn new(base_url: &str, store: Store, limiter: RateLimiter) -> Result<Self, VenueError> {
        Ok(Self {
            rest: RestClient::with_default_timeout(base_url)?,
            store,
            limiter,
        })
    }

    // ------------------------------------------------------------------
    // Public endpoints
    // ------------------------------------------------------------------

    /// Venue clock in unix seconds.
    pub async fn server_time(&self) -> Result<i64, VenueError> {
        self.limiter
            .acquire(buckets::CLOB, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let time = with_retry("/time", || self.rest.get_json::<i64>("/time", None, &[])).await?;
        Ok(time)
    }

    /// Best-effort clock-skew check against the venue; logs only.
    pub async fn log_clock_skew(&self) {
        match self.server_time().await {
            Ok(venue_seconds) => {
                let skew = chrono::Utc::now().timestamp() - venue_seconds;
                if skew.abs() > 5 {
                    warn!(skew_seconds = skew, "local clock differs from venue time");
                } else {
                    tracing::debug!(skew_seconds = skew, "venue clock checked");
                }
            }
            Err(e) => warn!(error = %e, "venue time probe failed"),
        }
    }

    /// Order book snapshot for a token.
    pub async fn order_book(&self, token_id: &str) -> Result<BookResponse, VenueError> {
        self.limiter
            .acquire(buckets::CLOB, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let query = format!("token_id={token_id}");
        let book = with_retry("/book", || {
            self.rest.get_json::<BookResponse>("/book", Some(&query), &[])
        })
        .await?;
        Ok(book)
    }

    /// Settlement mode of a market, from its book response.
    ///
    /// A missing flag is an error: without it the verifying contract is
    /// unknown, and guessing would sign against the wrong exchange.
    pub async fn market_neg_risk(&self, token_id: &str) -> Result<bool, VenueError> {
        let book = self.order_book(token_id).await?;
        book.neg_risk
            .ok_or_else(|| VenueError::MarketConfigurationUnavailable {
                token_id: token_id.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Authenticated endpoints
    // ------------------------------------------------------------------

    /// Collateral balance in dollars.
    pub async fn balance(&self) -> Result<Decimal, VenueError> {
        self.limiter
            .acquire(buckets::CLOB, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let path = "/balance-allowance";
        let query = "asset_type=COLLATERAL&signature_type=2";
        let headers = self.auth_headers("GET", path, None);
        let header_pairs = header_slice(&headers);

        let resp = with_retry(path, || {
            self.rest
                .get_json::<BalanceAllowanceResponse>(path, Some(query), &header_pairs)
        })
        .await?;
        Ok(resp.balance / MICRO_USDC)
    }

    /// The operator's own fills, newest first.
    pub async fn my_trades(&self) -> Result<Vec<ClobTrade>, VenueError> {
        self.limiter
            .acquire(buckets::CLOB, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let path = "/data/trades";
        let headers = self.auth_headers("GET", path, None);
        let header_pairs = header_slice(&headers);

        let trades = with_retry(path, || {
            self.rest.get_json::<Vec<ClobTrade>>(path, None, &header_pairs)
        })
        .await?;
        Ok(trades)
    }

    /// Submit a signed order. A `success: false` body surfaces as
    /// [`VenueError::OrderRejected`].
    pub async fn post_order(&self, request: &OrderRequest) -> Result<PostOrderResponse, VenueError> {
        self.limiter
            .acquire(buckets::CLOB, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let path = "/order";
        let body = serde_json::to_string(request).map_err(|e| VenueError::Malformed {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;
        let headers = self.auth_headers("POST", path, Some(&body));
        let header_pairs = header_slice(&headers);

        let resp = with_retry(path, || {
            self.rest.post_json::<PostOrderResponse>(path, &body, &header_pairs)
        })
        .await?;

        if !resp.success {
            return Err(VenueError::OrderRejected {
                message: resp.error_msg,
            });
        }
        Ok(resp)
    }

    /// L2 headers for one request, or empty when credentials are missing.
    /// The unsigned request will bounce with 401, which the caller sees as
    /// a `BadRequest`; that mirrors what the operator needs to fix.
    fn auth_headers(&self, method: &str, path: &str, body: Option<&str>) -> Vec<(String, String)> {
        let creds = match self.store.credentials() {
            Ok(Some(c)) if c.configured() => c,
            Ok(_) => {
                warn!(path = %path, "credentials not configured, sending unsigned request");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %path, error = %e, "credential lookup failed, sending unsigned request");
                return Vec::new();
            }
        };
        let signer = match RequestSigner::new(&creds) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path, error = %e, "request signing unavailable");
                return Vec::new();
            }
        };

        let timestamp = chrono::Utc::now().timestamp();
        signer
            .headers(timestamp, method, path, body)
            .as_pairs()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

fn header_slice(headers: &[(String, String)]) -> Vec<(&str, &str)> {
    headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::Credentials;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;

    const WALLET: &str = "0xabcdef0123456789abcdef0123456789abcdef01";

    #[tokio::test]
    async fn unsigned_when_store_is_empty() {
        let store = Store::open_in_memory().unwrap();
        let client =
            ClobClient::new("https://clob.example.com", store, RateLimiter::start()).unwrap();
        assert!(client.auth_headers("GET", "/balance-allowance", None).is_empty());
    }

    #[tokio::test]
    async fn signed_once_credentials_are_stored() {
        let store = Store::open_in_memory().unwrap();
        let creds = Credentials::new(
            "key",
            URL_SAFE.encode(b"secret"),
            "pass",
            WALLET,
            None,
            "0xpk",
        )
        .unwrap();
        store.update_credentials(&creds).unwrap();

        let client =
            ClobClient::new("https://clob.example.com", store, RateLimiter::start()).unwrap();
        let headers = client.auth_headers("POST", "/order", Some("{}"));
        let names: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "POLY_ADDRESS",
                "POLY_SIGNATURE",
                "POLY_TIMESTAMP",
                "POLY_API_KEY",
                "POLY_PASSPHRASE"
            ]
        );
    }
}
