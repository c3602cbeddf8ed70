//! The `StrategyModule` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_feed::FeedEvent;
use model::MarketInfo;
use serde_json::Value;

use crate::error::ModuleError;
use crate::signal::Signal;

/// Read-only context handed to every module callback.
pub struct ModuleContext<'a> {
    /// Wall-clock time of the callback.
    pub now: DateTime<Utc>,
    /// Cached market metadata for tokens the runner has discovered.
    pub market_info: &'a (dyn Fn(&str) -> Option<MarketInfo> + Send + Sync),
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        now: DateTime<Utc>,
        market_info: &'a (dyn Fn(&str) -> Option<MarketInfo> + Send + Sync),
    ) -> Self {
        Self { now, market_info }
    }

    pub fn info(&self, token_id: &str) -> Option<MarketInfo> {
        (self.market_info)(token_id)
    }
}

/// Decision logic of one strategy.
///
/// Implementations are owned by a single runner task, so callbacks take
/// `&mut self` and need no internal locking. Long-running work does not
/// belong here; both callbacks run on the runner's message loop.
#[async_trait]
pub trait StrategyModule: Send + Sync {
    /// Discovery tags this module wants the runner to scan, as persisted
    /// config values (`15m`, `1h`, `4h`, `weekly`).
    fn discovery_intervals(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether discovery should restrict to crypto-keyword markets.
    fn crypto_only(&self) -> bool {
        false
    }

    /// Tokens to watch regardless of discovery.
    fn target_tokens(&self) -> Vec<String> {
        Vec::new()
    }

    /// React to one order-book event for a discovered token.
    async fn handle_order(
        &mut self,
        event: &FeedEvent,
        ctx: &ModuleContext<'_>,
    ) -> Result<Vec<Signal>, ModuleError>;

    /// Periodic housekeeping (cooldown expiry, proactive scans). Called
    /// every five seconds by the runner.
    async fn handle_tick(&mut self, ctx: &ModuleContext<'_>) -> Result<Vec<Signal>, ModuleError>;
}

/// Boxed module, as stored by a runner.
pub type BoxedModule = Box<dyn StrategyModule>;
