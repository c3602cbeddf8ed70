//! Client for the public data API host.

use std::sync::Arc;

use futures_util::future::join_all;
use rate_limit::{buckets, RateLimiter, DEFAULT_ACQUIRE_TIMEOUT};
use rest_client::{with_retry, RestClient};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::error::VenueError;
use crate::responses::{ActivityItem, DataPosition};

const PAGE_SIZE: u32 = 500;
const BATCH_SIZE: usize = 10;

/// Progress callback for large activity fetches:
/// `(batch, total_batches, items_in_batch)`.
pub type ActivityProgress<'a> = &'a (dyn Fn(usize, usize, &[ActivityItem]) + Send + Sync);

/// Public data host client.
pub struct DataClient {
    rest: RestClient,
    limiter: RateLimiter,
    /// Global bound on concurrent activity pages, so overlapping fetches
    /// cannot stack up beyond one batch worth of requests.
    batch_permits: Arc<Semaphore>,
}

impl DataClient {
    pub fn new(base_url: &str, limiter: RateLimiter) -> Result<Self, VenueError> {
        Ok(Self {
            rest: RestClient::with_default_timeout(base_url)?,
            limiter,
            batch_permits: Arc::new(Semaphore::new(BATCH_SIZE)),
        })
    }

    /// All open positions of a wallet. Pages until the first short page.
    pub async fn positions(&self, user: &str) -> Result<Vec<DataPosition>, VenueError> {
        self.paged("/positions", user).await
    }

    /// All closed positions of a wallet.
    pub async fn closed_positions(&self, user: &str) -> Result<Vec<DataPosition>, VenueError> {
        self.paged("/closed-positions", user).await
    }

    async fn paged(&self, path: &'static str, user: &str) -> Result<Vec<DataPosition>, VenueError> {
        let mut all = Vec::new();
        let mut offset = 0u32;
        loop {
            self.limiter
                .acquire(buckets::DATA, DEFAULT_ACQUIRE_TIMEOUT)
                .await?;
            let query = format!("user={user}&limit={PAGE_SIZE}&offset={offset}");
            let page = with_retry(path, || {
                self.rest.get_json::<Vec<DataPosition>>(path, Some(&query), &[])
            })
            .await?;

            let count = page.len() as u32;
            all.extend(page);
            if count < PAGE_SIZE {
                return Ok(all);
            }
            offset += PAGE_SIZE;
        }
    }

    /// Recent activity of a wallet, newest first, up to `max` items.
    ///
    /// One blocking probe request goes out first; when the wallet has less
    /// than a page of history that is the whole answer. Otherwise the
    /// remaining pages are fetched in rolling batches of ten concurrent
    /// requests. A transport failure mid-fetch returns what was gathered
    /// so far instead of dropping all progress; any short page stops the
    /// fan-out early.
    pub async fn activity(
        &self,
        user: &str,
        max: u32,
        progress: Option<ActivityProgress<'_>>,
    ) -> Result<Vec<ActivityItem>, VenueError> {
        let mut all = self.activity_page(user, 0).await?;
        if (all.len() as u32) < PAGE_SIZE || max <= PAGE_SIZE {
            return Ok(all);
        }

        let total_pages = max.div_ceil(PAGE_SIZE);
        let remaining: Vec<u32> = (1..total_pages).collect();
        let total_batches = remaining.len().div_ceil(BATCH_SIZE);

        for (batch_index, pages) in remaining.chunks(BATCH_SIZE).enumerate() {
            let fetches = pages.iter().map(|page| {
                let permits = Arc::clone(&self.batch_permits);
                let offset = page * PAGE_SIZE;
                async move {
                    let _permit = permits.acquire().await;
                    self.activity_page(user, offset).await
                }
            });

            let mut batch_items = Vec::new();
            let mut stop = false;
            for result in join_all(fetches).await {
                match result {
                    Ok(items) => {
                        if (items.len() as u32) < PAGE_SIZE {
                            stop = true;
                        }
                        batch_items.extend(items);
                    }
                    Err(e) => {
                        warn!(user = %user, error = %e, "activity page failed, returning partial set");
                        stop = true;
                    }
                }
            }

            if let Some(cb) = progress {
                cb(batch_index + 1, total_batches, &batch_items);
            }
            all.extend(batch_items);
            if stop {
                break;
            }
        }

        Ok(all)
    }

    async fn activity_page(&self, user: &str, offset: u32) -> Result<Vec<ActivityItem>, VenueError> {
        self.limiter
            .acquire(buckets::DATA, DEFAULT_ACQUIRE_TIMEOUT)
            .await?;
        let query = format!("user={user}&limit={PAGE_SIZE}&offset={offset}");
        let items = with_retry("/activity", || {
            self.rest
                .get_json::<Vec<ActivityItem>>("/activity", Some(&query), &[])
        })
        .await?;
        Ok(items)
    }
}
