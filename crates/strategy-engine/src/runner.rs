//! The per-strategy runner task.
//!
//! One runner owns one strategy: it discovers markets, keeps the feed
//! subscriptions in sync, forwards order events into the module, and
//! executes the signals that come back — on paper or against the venue.
//! Every failure inside the loop is converted into an event-log entry;
//! only the inability to persist at all ends the task with `error`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use event_bus::{topic, BusEvent, EventBus};
use futures_util::StreamExt;
use market_feed::{FeedEvent, FeedHandle};
use metadata::{MetadataFetcher, ResolutionTag};
use model::{EventKind, MarketInfo, Side, StrategyStatus, TradeStatus};
use order_signer::{clamp_price_to_grid, OrderArgs, OrderSigner, OrderType};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use storage::{NewTrade, Store, StrategyRow};
use strategy_core::{BoxedModule, ModuleContext, Signal};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use venue_client::ClobClient;

const TICK_PERIOD: Duration = Duration::from_secs(5);
const DISCOVERY_PERIOD: Duration = Duration::from_secs(120);
const PRICE_BROADCAST_MIN_GAP: Duration = Duration::from_millis(250);
const SEED_CONCURRENCY: usize = 5;

/// Shared collaborators a runner needs.
#[derive(Clone)]
pub struct RunnerDeps {
    pub store: Store,
    pub fetcher: Arc<MetadataFetcher>,
    pub clob: Arc<ClobClient>,
    pub feed: FeedHandle,
    pub bus: EventBus,
}

/// Commands the engine can send a live runner.
#[derive(Debug)]
pub(crate) enum RunnerCommand {
    Pause,
    Resume,
    /// Snapshot of the discovered token set; answered best-effort.
    GetDiscovered(oneshot::Sender<Vec<String>>),
}

#[derive(Debug, Error)]
enum ExecError {
    #[error(transparent)]
    Venue(#[from] venue_client::VenueError),
    #[error(transparent)]
    Signer(#[from] order_signer::SignerError),
    #[error(transparent)]
    Store(#[from] storage::StoreError),
    #[error("credentials not configured")]
    CredentialsNotConfigured,
}

#[derive(Debug, Clone, Serialize)]
struct TokenQuote {
    best_bid: Option<Decimal>,
    best_ask: Option<Decimal>,
    last_price: Option<Decimal>,
    outcome: String,
    question: String,
    updated_at: i64,
}

pub(crate) struct Runner {
    strategy: StrategyRow,
    module: BoxedModule,
    deps: RunnerDeps,
    discovered: HashMap<String, MarketInfo>,
    token_prices: HashMap<String, TokenQuote>,
    target_tokens: Vec<String>,
    last_price_broadcast: Option<Instant>,
    paused: bool,
}

impl Runner {
    pub(crate) fn new(strategy: StrategyRow, module: BoxedModule, deps: RunnerDeps) -> Self {
        Self {
            strategy,
            module,
            deps,
            discovered: HashMap::new(),
            token_prices: HashMap::new(),
            target_tokens: Vec::new(),
            last_price_broadcast: None,
            paused: false,
        }
    }

    pub(crate) async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        mut commands: mpsc::Receiver<RunnerCommand>,
    ) {
        let id = self.strategy.id;

        if let Err(e) = self.startup().await {
            warn!(strategy_id = id, error = %e, "runner startup failed");
            let _ = self.deps.store.update_strategy_status(id, StrategyStatus::Error);
            self.log(EventKind::Error, &format!("startup failed: {e}"), Value::Null);
            self.publish_status("error");
            return;
        }

        let mut feed_events = self.deps.feed.events();
        let mut tick = tokio::time::interval(TICK_PERIOD);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut discovery = tokio::time::interval(DISCOVERY_PERIOD);
        discovery.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut clean = true;
        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }

                cmd = commands.recv() => {
                    match cmd {
                        Some(RunnerCommand::Pause) => self.set_paused(true),
                        Some(RunnerCommand::Resume) => self.set_paused(false),
                        Some(RunnerCommand::GetDiscovered(reply)) => {
                            let _ = reply.send(self.discovered.keys().cloned().collect());
                        }
                        None => break,
                    }
                }

                event = feed_events.recv() => {
                    match event {
                        Ok(event) => self.on_feed_event(event).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!(strategy_id = id, missed = n, "runner lagged behind the feed");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            warn!(strategy_id = id, "feed closed under the runner");
                            clean = false;
                            break;
                        }
                    }
                }

                // The first discovery fires immediately after start.
                _ = discovery.tick() => self.discover().await,

                _ = tick.tick() => self.on_tick().await,
            }
        }

        self.teardown(clean).await;
    }

    async fn startup(&mut self) -> Result<(), storage::StoreError> {
        let id = self.strategy.id;
        self.deps
            .store
            .update_strategy_status(id, StrategyStatus::Running)?;
        self.log(
            EventKind::Info,
            "runner started",
            json!({"paper_mode": self.strategy.paper_mode}),
        );
        self.publish_status("running");

        // Pre-configured targets are watched before discovery kicks in.
        self.target_tokens = self.module.target_tokens();
        if !self.target_tokens.is_empty() {
            for token in self.target_tokens.clone() {
                match self.deps.fetcher.token_info(&token).await {
                    Ok(info) => {
                        self.discovered.insert(token.clone(), info);
                    }
                    Err(e) => {
                        warn!(strategy_id = id, token = %token, error = %e, "target token lookup failed");
                    }
                }
            }
            self.deps.feed.subscribe_tokens(self.target_tokens.clone()).await;
            self.seed_prices(self.target_tokens.clone()).await;
        }
        Ok(())
    }

    async fn teardown(&mut self, clean: bool) {
        let id = self.strategy.id;
        let tokens: Vec<String> = self.discovered.keys().cloned().collect();
        if !tokens.is_empty() {
            self.deps.feed.unsubscribe_tokens(tokens).await;
        }

        let (status, label) = if clean {
            (StrategyStatus::Stopped, "stopped")
        } else {
            (StrategyStatus::Error, "error")
        };
        if let Err(e) = self.deps.store.update_strategy_status(id, status) {
            warn!(strategy_id = id, error = %e, "failed to persist final status");
        }
        let kind = if clean { EventKind::Info } else { EventKind::Error };
        self.log(kind, &format!("runner {label}"), Value::Null);
        self.publish_status(label);
        info!(strategy_id = id, status = label, "runner finished");
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    async fn discover(&mut self) {
        let id = self.strategy.id;
        let tags: Vec<ResolutionTag> = self
            .module
            .discovery_intervals()
            .iter()
            .filter_map(|i| ResolutionTag::from_config(i))
            .collect();
        if tags.is_empty() {
            return;
        }

        let found = match self
            .deps
            .fetcher
            .discover(&tags, self.module.crypto_only())
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(strategy_id = id, error = %e, "discovery failed");
                return;
            }
        };

        let mut fresh: HashMap<String, MarketInfo> = HashMap::new();
        for token in found {
            fresh.insert(token.token_id, token.info);
        }
        // Targets stay discovered whatever the scan returns.
        for target in &self.target_tokens {
            if !fresh.contains_key(target) {
                if let Some(info) = self.discovered.get(target) {
                    fresh.insert(target.clone(), info.clone());
                }
            }
        }

        let added: Vec<String> = fresh
            .keys()
            .filter(|t| !self.discovered.contains_key(*t))
            .cloned()
            .collect();
        let removed: Vec<String> = self
            .discovered
            .keys()
            .filter(|t| !fresh.contains_key(*t))
            .cloned()
            .collect();

        self.discovered = fresh;

        if !added.is_empty() {
            debug!(strategy_id = id, added = added.len(), "discovery added tokens");
            self.deps.feed.subscribe_tokens(added.clone()).await;
            self.seed_prices(added.clone()).await;
            self.deps.bus.publish(
                &topic::strategy(id),
                BusEvent::DiscoveredTokens {
                    strategy_id: id,
                    tokens: added,
                },
            );
        }
        if !removed.is_empty() {
            debug!(strategy_id = id, removed = removed.len(), "discovery removed tokens");
            for token in &removed {
                self.token_prices.remove(token);
            }
            self.deps.feed.unsubscribe_tokens(removed.clone()).await;
            self.deps.bus.publish(
                &topic::strategy(id),
                BusEvent::RemovedTokens {
                    strategy_id: id,
                    tokens: removed,
                },
            );
        }
    }

    /// Seed top-of-book prices over REST, a few tokens at a time.
    async fn seed_prices(&mut self, tokens: Vec<String>) {
        let clob = Arc::clone(&self.deps.clob);
        let books: Vec<(String, _)> = futures_util::stream::iter(tokens)
            .map(|token| {
                let clob = Arc::clone(&clob);
                async move {
                    let book = clob.order_book(&token).await;
                    (token, book)
                }
            })
            .buffer_unordered(SEED_CONCURRENCY)
            .collect()
            .await;

        for (token, book) in books {
            match book {
                Ok(book) => {
                    let info = self.discovered.get(&token);
                    self.token_prices.insert(
                        token,
                        TokenQuote {
                            best_bid: book.best_bid(),
                            best_ask: book.best_ask(),
                            last_price: None,
                            outcome: info.map(|i| i.outcome.clone()).unwrap_or_default(),
                            question: info.map(|i| i.question.clone()).unwrap_or_default(),
                            updated_at: Utc::now().timestamp(),
                        },
                    );
                }
                Err(e) => {
                    debug!(token = %token, error = %e, "price seed failed");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Feed events and ticks
    // ------------------------------------------------------------------

    async fn on_feed_event(&mut self, event: FeedEvent) {
        let token = event.asset_id().to_string();
        if !self.discovered.contains_key(&token) {
            return;
        }

        self.update_quote(&token, &event);
        self.maybe_broadcast_prices();

        if self.paused {
            return;
        }

        let signals = {
            let discovered = &self.discovered;
            let cache = self.deps.fetcher.cache().clone();
            let lookup = move |t: &str| discovered.get(t).cloned().or_else(|| cache.lookup(t));
            let ctx = ModuleContext::new(Utc::now(), &lookup);
            self.module.handle_order(&event, &ctx).await
        };

        match signals {
            Ok(signals) => {
                for signal in signals {
                    self.execute(signal).await;
                }
            }
            Err(e) => {
                self.log(EventKind::Error, &e.to_string(), Value::Null);
            }
        }
    }

    async fn on_tick(&mut self) {
        if self.paused {
            return;
        }
        let signals = {
            let discovered = &self.discovered;
            let cache = self.deps.fetcher.cache().clone();
            let lookup = move |t: &str| discovered.get(t).cloned().or_else(|| cache.lookup(t));
            let ctx = ModuleContext::new(Utc::now(), &lookup);
            self.module.handle_tick(&ctx).await
        };

        match signals {
            Ok(signals) => {
                for signal in signals {
                    self.execute(signal).await;
                }
            }
            Err(e) => {
                self.log(EventKind::Error, &e.to_string(), Value::Null);
            }
        }
    }

    fn update_quote(&mut self, token: &str, event: &FeedEvent) {
        let info = self.discovered.get(token);
        let quote = self
            .token_prices
            .entry(token.to_string())
            .or_insert_with(|| TokenQuote {
                best_bid: None,
                best_ask: None,
                last_price: None,
                outcome: info.map(|i| i.outcome.clone()).unwrap_or_default(),
                question: info.map(|i| i.question.clone()).unwrap_or_default(),
                updated_at: 0,
            });

        match event {
            FeedEvent::PriceChange(change) => {
                if change.best_bid.is_some() {
                    quote.best_bid = change.best_bid;
                }
                if change.best_ask.is_some() {
                    quote.best_ask = change.best_ask;
                }
                if change.price.is_some() {
                    quote.last_price = change.price;
                }
            }
            FeedEvent::Trade(trade) => {
                if trade.price.is_some() {
                    quote.last_price = trade.price;
                }
            }
        }
        quote.updated_at = Utc::now().timestamp();
    }

    /// Broadcast the price map at most every 250 ms.
    fn maybe_broadcast_prices(&mut self) {
        let due = match self.last_price_broadcast {
            Some(last) => last.elapsed() >= PRICE_BROADCAST_MIN_GAP,
            None => true,
        };
        if !due {
            return;
        }
        self.last_price_broadcast = Some(Instant::now());
        let id = self.strategy.id;
        if let Ok(prices) = serde_json::to_value(&self.token_prices) {
            self.deps.bus.publish(
                &topic::strategy(id),
                BusEvent::PriceUpdate {
                    strategy_id: id,
                    prices,
                },
            );
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    async fn execute(&mut self, signal: Signal) {
        let id = self.strategy.id;
        let price = clamp_price_to_grid(signal.price);
        let side = signal.action.side();

        self.log(
            EventKind::Signal,
            &signal.reason,
            json!({
                "token_id": signal.token_id,
                "action": side.as_venue_str(),
                "price": price.to_string(),
                "size": signal.size.to_string(),
                "metadata": signal.metadata.clone(),
            }),
        );
        if let Ok(payload) = serde_json::to_value(&signal) {
            self.deps.bus.publish(
                &topic::strategy(id),
                BusEvent::Signal {
                    strategy_id: id,
                    signal: payload,
                },
            );
        }

        // SELLs that must be position-backed are skipped, not partially
        // executed, when the held size is short.
        if !self.strategy.paper_mode && side == Side::Sell && signal.requires_position {
            let held = match self.deps.store.position(id, &signal.token_id) {
                Ok(Some(pos)) => pos.size,
                Ok(None) => Decimal::ZERO,
                Err(e) => {
                    self.log(EventKind::Error, &format!("position lookup failed: {e}"), Value::Null);
                    return;
                }
            };
            if held < signal.size {
                self.log(
                    EventKind::Warning,
                    "sell skipped: position smaller than signal size",
                    json!({
                        "token_id": signal.token_id,
                        "position_size": held.to_string(),
                        "signal_size": signal.size.to_string(),
                    }),
                );
                return;
            }
        }

        let info = self.discovered.get(&signal.token_id).cloned();
        let status = if self.strategy.paper_mode {
            TradeStatus::Simulated
        } else {
            TradeStatus::Pending
        };
        let new_trade = NewTrade {
            strategy_id: id,
            market_id: info.as_ref().map(|i| i.condition_id.clone()).unwrap_or_default(),
            asset_id: signal.token_id.clone(),
            side,
            price,
            size: signal.size,
            status,
            title: info.as_ref().map(|i| i.question.clone()).unwrap_or_default(),
            outcome: info.as_ref().map(|i| i.outcome.clone()).unwrap_or_default(),
        };
        let trade_id = match self.deps.store.insert_trade(&new_trade) {
            Ok(trade_id) => trade_id,
            Err(e) => {
                self.log(EventKind::Error, &format!("trade insert failed: {e}"), Value::Null);
                return;
            }
        };

        if self.strategy.paper_mode {
            self.settle_paper(trade_id, &signal, side, price).await;
        } else {
            self.settle_live(trade_id, &signal, side, price).await;
        }
    }

    async fn settle_paper(&mut self, trade_id: i64, signal: &Signal, side: Side, price: Decimal) {
        let id = self.strategy.id;
        if let Err(e) = self.deps.store.mark_trade_filled(trade_id) {
            self.log(EventKind::Error, &format!("paper fill failed: {e}"), Value::Null);
            return;
        }
        match self
            .deps
            .store
            .apply_fill(id, &signal.token_id, side, signal.size, price)
        {
            Ok(position) => {
                self.log(
                    EventKind::Trade,
                    "paper order filled",
                    json!({
                        "trade_id": trade_id,
                        "token_id": signal.token_id,
                        "position_size": position.size.to_string(),
                    }),
                );
                self.broadcast_order(trade_id, signal, side, price, true);
            }
            Err(e) => {
                self.log(EventKind::Error, &format!("position update failed: {e}"), Value::Null);
            }
        }
    }

    async fn settle_live(&mut self, trade_id: i64, signal: &Signal, side: Side, price: Decimal) {
        let id = self.strategy.id;
        match self.place_live(&signal.token_id, side, price, signal.size).await {
            Ok(order_id) => {
                if let Err(e) = self.deps.store.mark_trade_submitted(trade_id, &order_id) {
                    self.log(EventKind::Error, &format!("trade update failed: {e}"), Value::Null);
                    return;
                }
                if let Err(e) = self
                    .deps
                    .store
                    .apply_fill(id, &signal.token_id, side, signal.size, price)
                {
                    self.log(EventKind::Error, &format!("position update failed: {e}"), Value::Null);
                }
                self.log(
                    EventKind::Trade,
                    "order submitted",
                    json!({"trade_id": trade_id, "order_id": order_id}),
                );
                self.broadcast_order(trade_id, signal, side, price, false);
            }
            Err(e) => {
                let reason = e.to_string();
                if let Err(e) = self.deps.store.mark_trade_failed(trade_id, &reason) {
                    self.log(EventKind::Error, &format!("trade update failed: {e}"), Value::Null);
                }
                self.log(
                    EventKind::Error,
                    "order submission failed",
                    json!({"trade_id": trade_id, "reason": reason}),
                );
            }
        }
    }

    async fn place_live(
        &self,
        token_id: &str,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Result<String, ExecError> {
        let creds = self
            .deps
            .store
            .credentials()?
            .filter(|c| c.configured())
            .ok_or(ExecError::CredentialsNotConfigured)?;

        let neg_risk = self.deps.clob.market_neg_risk(token_id).await?;
        let signer = OrderSigner::new(
            creds.expose_private_key(),
            &creds.wallet_address,
            creds.signer_address.as_deref(),
        )?;
        let signed = signer.sign_order(&OrderArgs {
            token_id: token_id.to_string(),
            price,
            size,
            is_buy: side == Side::Buy,
            neg_risk,
        })?;
        let request = signed.into_request(creds.api_key.clone(), OrderType::GTC);
        let response = self.deps.clob.post_order(&request).await?;
        Ok(response.order_id)
    }

    fn broadcast_order(
        &self,
        trade_id: i64,
        signal: &Signal,
        side: Side,
        price: Decimal,
        paper_mode: bool,
    ) {
        let id = self.strategy.id;
        self.deps.bus.publish(
            &topic::strategy(id),
            BusEvent::PaperOrder {
                strategy_id: id,
                trade: json!({
                    "trade_id": trade_id,
                    "token_id": signal.token_id,
                    "side": side.as_venue_str(),
                    "price": price.to_string(),
                    "size": signal.size.to_string(),
                    "reason": signal.reason,
                }),
                paper_mode,
            },
        );
    }

    // ------------------------------------------------------------------
    // Small helpers
    // ------------------------------------------------------------------

    fn set_paused(&mut self, paused: bool) {
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        let (status, label) = if paused {
            (StrategyStatus::Paused, "paused")
        } else {
            (StrategyStatus::Running, "running")
        };
        if let Err(e) = self.deps.store.update_strategy_status(self.strategy.id, status) {
            warn!(strategy_id = self.strategy.id, error = %e, "status update failed");
        }
        self.log(EventKind::Info, &format!("runner {label}"), Value::Null);
        self.publish_status(label);
    }

    fn log(&self, kind: EventKind, message: &str, metadata: Value) {
        if let Err(e) = self
            .deps
            .store
            .append_event(self.strategy.id, kind, message, &metadata)
        {
            warn!(strategy_id = self.strategy.id, error = %e, "event log write failed");
        }
    }

    fn publish_status(&self, status: &str) {
        let id = self.strategy.id;
        let event = BusEvent::StrategyStatus {
            strategy_id: id,
            status: status.to_string(),
        };
        self.deps.bus.publish(topic::STRATEGY_UPDATES, event.clone());
        self.deps.bus.publish(&topic::strategy(id), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::EventBus;
    use market_feed::spawn_feed;
    use metadata::MarketCache;
    use model::PositionSide;
    use rate_limit::RateLimiter;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tokio::sync::watch as watch_channel;

    use crate::time_decay::{TimeDecayModule, TIME_DECAY_KIND};

    fn deps(store: Store) -> RunnerDeps {
        let limiter = RateLimiter::start();
        let cache = MarketCache::new();
        let (_, shutdown_rx) = watch_channel::channel(false);
        let feed = spawn_feed(
            "wss://feed.invalid/ws/market".to_string(),
            EventBus::new(),
            cache.clone(),
            shutdown_rx,
        );
        RunnerDeps {
            store: store.clone(),
            fetcher: Arc::new(
                MetadataFetcher::new("https://gamma.invalid", limiter.clone(), cache).unwrap(),
            ),
            clob: Arc::new(ClobClient::new("https://clob.invalid", store, limiter).unwrap()),
            feed,
            bus: EventBus::new(),
        }
    }

    fn runner(paper_mode: bool) -> Runner {
        let store = Store::open_in_memory().unwrap();
        let row = store
            .insert_strategy(
                "decay",
                TIME_DECAY_KIND,
                &json!({"intervals": ["15m"]}),
                paper_mode,
            )
            .unwrap();
        let module = Box::new(TimeDecayModule::from_config(&row.config).unwrap());
        let mut runner = Runner::new(row, module, deps(store));
        runner.discovered.insert(
            "tok".to_string(),
            MarketInfo {
                question: "Bitcoin above $100k at 3pm?".to_string(),
                event_title: "BTC".to_string(),
                event_slug: "btc".to_string(),
                condition_id: "0xcond".to_string(),
                outcome: "Yes".to_string(),
                opposite_token_id: Some("opp".to_string()),
                price: Some(dec!(0.9)),
                end_date: None,
                neg_risk: Some(false),
            },
        );
        runner
    }

    #[tokio::test]
    async fn paper_buy_fills_and_updates_position() {
        let mut r = runner(true);
        let id = r.strategy.id;

        r.execute(Signal::buy("tok", dec!(0.9994), dec!(10), "test buy"))
            .await;

        let trades = r.deps.store.recent_trades(id, 10).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].status, TradeStatus::Filled);
        // Tick-grid clamp before anything is persisted.
        assert_eq!(trades[0].price, dec!(0.999));
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[0].market_id, "0xcond");

        let pos = r.deps.store.position(id, "tok").unwrap().unwrap();
        assert_eq!(pos.size, dec!(10));
        assert_eq!(pos.avg_price, dec!(0.999));
        assert_eq!(pos.side, PositionSide::Yes);
    }

    #[tokio::test]
    async fn paper_sells_reduce_the_position() {
        let mut r = runner(true);
        let id = r.strategy.id;

        r.execute(Signal::buy("tok", dec!(0.5), dec!(20), "entry")).await;
        r.execute(Signal::sell("tok", dec!(0.8), dec!(5), "trim")).await;

        let pos = r.deps.store.position(id, "tok").unwrap().unwrap();
        assert_eq!(pos.size, dec!(15));
        assert_eq!(pos.avg_price, dec!(0.500));
        assert_eq!(pos.current_price, dec!(0.800));
    }

    #[tokio::test]
    async fn live_sell_without_position_is_skipped() {
        let mut r = runner(false);
        let id = r.strategy.id;
        // Held size 3 < signal size 7.
        r.deps
            .store
            .apply_fill(id, "tok", Side::Buy, dec!(3), dec!(0.5))
            .unwrap();

        r.execute(Signal::sell("tok", dec!(0.9), dec!(7), "exit")).await;

        // No trade row was created and a warning landed in the log.
        assert!(r.deps.store.recent_trades(id, 10).unwrap().is_empty());
        let events = r.deps.store.recent_events(id, 10).unwrap();
        assert!(events.iter().any(|e| e.kind == EventKind::Warning));
        // Position untouched.
        let pos = r.deps.store.position(id, "tok").unwrap().unwrap();
        assert_eq!(pos.size, dec!(3));
    }

    #[tokio::test]
    async fn signals_land_in_the_event_log() {
        let mut r = runner(true);
        let id = r.strategy.id;

        r.execute(Signal::buy("tok", dec!(0.96), dec!(10), "threshold crossed"))
            .await;

        let events = r.deps.store.recent_events(id, 10).unwrap();
        assert!(events
            .iter()
            .any(|e| e.kind == EventKind::Signal && e.message == "threshold crossed"));
        assert!(events.iter().any(|e| e.kind == EventKind::Trade));
    }
}
