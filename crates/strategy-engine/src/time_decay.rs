//! The built-in time-decay strategy.
//!
//! Short-lived binary markets drift toward 0 or 1 as resolution
//! approaches. When the near-certain side trades above the signal
//! threshold inside the configured window, the module buys it and rides
//! the last stretch to settlement. One trade per market: a fired signal
//! puts both the token and its opposite on cooldown, and a placed-order
//! guard stops a re-fire even if the cooldown is cleared.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use market_feed::FeedEvent;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use strategy_core::{ModuleContext, ModuleError, Signal, StrategyModule};
use tracing::{debug, trace};

/// Strategy type tag in the strategies table.
pub const TIME_DECAY_KIND: &str = "time_decay";

/// Prices below this are treated as noise or inverted books.
const SAFETY_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Smallest order the venue accepts, in dollars and shares.
const MIN_ORDER_DOLLARS: Decimal = Decimal::ONE;
const MIN_ORDER_SHARES: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Persisted configuration, with per-timeframe defaults merged in.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeDecayConfig {
    /// Discovery intervals: `15m`, `1h`, `4h`, `weekly`.
    #[serde(default = "default_intervals")]
    pub intervals: Vec<String>,
    /// Fire when the evaluated price exceeds this.
    #[serde(default = "default_signal_threshold")]
    pub signal_threshold: Decimal,
    /// Order size in dollars.
    #[serde(default = "default_order_size")]
    pub order_size: Decimal,
    /// Buy at `limit_price` instead of the best ask.
    #[serde(default)]
    pub use_limit_order: bool,
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Cooldown applied to a fired market pair.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
    /// Minimum estimated profit in dollars for a signal to fire.
    #[serde(default = "default_min_profit")]
    pub min_profit: Decimal,
    /// Restrict to crypto markets.
    #[serde(default = "default_true")]
    pub crypto_only: bool,
    /// Only evaluate tokens resolving within this many minutes. Defaults
    /// to the shortest configured interval's window.
    #[serde(default)]
    pub min_minutes: Option<i64>,
    /// Tokens to watch in addition to discovery.
    #[serde(default)]
    pub target_tokens: Vec<String>,
}

fn default_intervals() -> Vec<String> {
    vec!["15m".to_string()]
}
fn default_signal_threshold() -> Decimal {
    Decimal::new(95, 2) // 0.95
}
fn default_order_size() -> Decimal {
    Decimal::TEN
}
fn default_cooldown_seconds() -> i64 {
    200
}
fn default_min_profit() -> Decimal {
    Decimal::new(1, 1) // 0.10
}
fn default_true() -> bool {
    true
}

impl TimeDecayConfig {
    /// Parse and complete a persisted config value.
    pub fn from_value(value: &Value) -> Result<Self, ModuleError> {
        let mut config: Self = serde_json::from_value(value.clone())
            .map_err(|e| ModuleError::InvalidConfig(e.to_string()))?;
        config.validate()?;

        // Timeframe default: the tightest interval bounds the window.
        if config.min_minutes.is_none() {
            config.min_minutes = config
                .intervals
                .iter()
                .filter_map(|i| metadata::ResolutionTag::from_config(i))
                .map(|tag| tag.window_minutes().1)
                .min();
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ModuleError> {
        if self.intervals.is_empty() {
            return Err(ModuleError::InvalidConfig("no intervals configured".into()));
        }
        for interval in &self.intervals {
            if metadata::ResolutionTag::from_config(interval).is_none() {
                return Err(ModuleError::InvalidConfig(format!(
                    "unknown interval `{interval}`"
                )));
            }
        }
        if self.order_size <= Decimal::ZERO {
            return Err(ModuleError::InvalidConfig("order_size must be positive".into()));
        }
        if self.signal_threshold <= Decimal::ZERO || self.signal_threshold >= Decimal::ONE {
            return Err(ModuleError::InvalidConfig(
                "signal_threshold must be inside (0, 1)".into(),
            ));
        }
        if self.use_limit_order && self.limit_price.is_none() {
            return Err(ModuleError::InvalidConfig(
                "use_limit_order requires limit_price".into(),
            ));
        }
        Ok(())
    }
}

/// Module state.
pub struct TimeDecayModule {
    config: TimeDecayConfig,
    /// Token -> cooldown expiry. Both legs of a fired market live here.
    cooldowns: HashMap<String, DateTime<Utc>>,
    /// Redundant re-fire guard, kept even if a cooldown is cleared.
    placed_orders: HashMap<String, Signal>,
    /// Tokens that passed the gates at least once (stats only).
    evaluated_tokens: HashSet<String>,
}

impl TimeDecayModule {
    pub fn from_config(value: &Value) -> Result<Self, ModuleError> {
        Ok(Self {
            config: TimeDecayConfig::from_value(value)?,
            cooldowns: HashMap::new(),
            placed_orders: HashMap::new(),
            evaluated_tokens: HashSet::new(),
        })
    }

    pub fn config(&self) -> &TimeDecayConfig {
        &self.config
    }

    fn on_cooldown(&self, token_id: &str, now: DateTime<Utc>) -> bool {
        self.cooldowns
            .get(token_id)
            .is_some_and(|expiry| *expiry > now)
    }

    fn evaluate(
        &mut self,
        token_id: &str,
        best_bid: Option<Decimal>,
        best_ask: Option<Decimal>,
        last_price: Option<Decimal>,
        ctx: &ModuleContext<'_>,
    ) -> Option<Signal> {
        let eval_price = eval_price(best_bid, best_ask, last_price)?;

        // Safety gates: sub-floor prices mean a dead or inverted book.
        if eval_price < SAFETY_FLOOR {
            return None;
        }
        if best_ask.is_some_and(|ask| ask < SAFETY_FLOOR) {
            return None;
        }

        let info = ctx.info(token_id)?;
        if self.config.crypto_only && !info.is_crypto() {
            return None;
        }
        let minutes = info.minutes_to_resolution(ctx.now)?;
        let window = self.config.min_minutes.unwrap_or(i64::MAX);
        if minutes <= 0 || minutes > window {
            return None;
        }

        self.evaluated_tokens.insert(token_id.to_string());

        if self.on_cooldown(token_id, ctx.now) || self.placed_orders.contains_key(token_id) {
            trace!(token_id, "suppressed by cooldown or placed order");
            return None;
        }

        if eval_price <= self.config.signal_threshold {
            return None;
        }

        let buy_price = if self.config.use_limit_order {
            self.config.limit_price?
        } else {
            best_ask?
        };
        let shares = self.config.order_size / buy_price;
        let estimated_profit = (Decimal::ONE - buy_price) * shares;

        if self.config.order_size < MIN_ORDER_DOLLARS
            || shares < MIN_ORDER_SHARES
            || estimated_profit < self.config.min_profit
        {
            debug!(
                token_id,
                %shares,
                %estimated_profit,
                "signal below minimum order gates"
            );
            return None;
        }

        let expiry = ctx.now + ChronoDuration::seconds(self.config.cooldown_seconds);
        self.cooldowns.insert(token_id.to_string(), expiry);
        if let Some(opposite) = &info.opposite_token_id {
            self.cooldowns.insert(opposite.clone(), expiry);
        }

        let signal = Signal::buy(
            token_id,
            buy_price,
            shares,
            format!("price {eval_price} above threshold {}", self.config.signal_threshold),
        )
        .with_metadata(json!({
            "eval_price": eval_price.to_string(),
            "minutes_to_resolution": minutes,
            "estimated_profit": estimated_profit.to_string(),
            "question": info.question,
        }));
        self.placed_orders.insert(token_id.to_string(), signal.clone());
        Some(signal)
    }
}

/// Midpoint when both sides exist, otherwise whichever is present, else
/// the last trade price.
fn eval_price(
    best_bid: Option<Decimal>,
    best_ask: Option<Decimal>,
    last_price: Option<Decimal>,
) -> Option<Decimal> {
    match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
        (Some(bid), None) => Some(bid),
        (None, Some(ask)) => Some(ask),
        (None, None) => last_price,
    }
}

#[async_trait]
impl StrategyModule for TimeDecayModule {
    fn discovery_intervals(&self) -> Vec<String> {
        self.config.intervals.clone()
    }

    fn crypto_only(&self) -> bool {
        self.config.crypto_only
    }

    fn target_tokens(&self) -> Vec<String> {
        self.config.target_tokens.clone()
    }

    async fn handle_order(
        &mut self,
        event: &FeedEvent,
        ctx: &ModuleContext<'_>,
    ) -> Result<Vec<Signal>, ModuleError> {
        let signal = match event {
            FeedEvent::PriceChange(change) => self.evaluate(
                &change.asset_id,
                change.best_bid,
                change.best_ask,
                change.price,
                ctx,
            ),
            FeedEvent::Trade(trade) => self.evaluate(&trade.asset_id, None, None, trade.price, ctx),
        };
        Ok(signal.into_iter().collect())
    }

    async fn handle_tick(&mut self, ctx: &ModuleContext<'_>) -> Result<Vec<Signal>, ModuleError> {
        let now = ctx.now;
        self.cooldowns.retain(|_, expiry| *expiry > now);
        Ok(Vec::new())
    }
}
