//! Token-id keyed market info cache with per-entry expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use model::MarketInfo;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// How long one cached entry stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

/// Sweep period for expired entries.
const SWEEP_PERIOD: Duration = Duration::from_secs(300);

/// Soft bound on entries; oldest-expiring entries are evicted on overflow.
const SOFT_CAP: usize = 100_000;

struct Entry {
    info: MarketInfo,
    expires_at: Instant,
}

/// Shared in-memory market info cache. Cheap to clone.
#[derive(Clone, Default)]
pub struct MarketCache {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Entry for a token if present and not expired.
    pub fn lookup(&self, token_id: &str) -> Option<MarketInfo> {
        let map = self.inner.read();
        let entry = map.get(token_id)?;
        (entry.expires_at > Instant::now()).then(|| entry.info.clone())
    }

    /// Insert with the default TTL, replacing unconditionally.
    pub fn insert(&self, token_id: impl Into<String>, info: MarketInfo) {
        self.insert_with_ttl(token_id, info, CACHE_TTL);
    }

    pub fn insert_with_ttl(&self, token_id: impl Into<String>, info: MarketInfo, ttl: Duration) {
        let mut map = self.inner.write();
        if map.len() >= SOFT_CAP {
            evict_oldest(&mut map);
        }
        map.insert(
            token_id.into(),
            Entry {
                info,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove expired entries; returns the remaining count.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut map = self.inner.write();
        map.retain(|_, entry| entry.expires_at > now);
        map.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

fn evict_oldest(map: &mut HashMap<String, Entry>) {
    if let Some(oldest) = map
        .iter()
        .min_by_key(|(_, e)| e.expires_at)
        .map(|(k, _)| k.clone())
    {
        map.remove(&oldest);
    }
}

/// Background sweep every five minutes.
pub fn spawn_sweeper(cache: MarketCache) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SWEEP_PERIOD);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it.
        tick.tick().await;
        loop {
            tick.tick().await;
            let remaining = cache.sweep();
            debug!(remaining, "market cache sweep");
        }
    })
}
