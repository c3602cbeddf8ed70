//! The feed task: connection lifecycle, subscriptions, batching, health.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::Backoff;
use event_bus::{topic, BusEvent, EventBus};
use futures_util::{SinkExt, StreamExt};
use metadata::MarketCache;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::metrics::{FeedMetrics, FeedSnapshot};
use crate::protocol::{parse_frame, FeedEvent, SubscribeRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const BATCH_FLUSH_PERIOD: Duration = Duration::from_millis(50);
const BATCH_MAX: usize = 50;
const HEALTH_PERIOD: Duration = Duration::from_secs(10);
const STALE_AFTER: Duration = Duration::from_secs(15);
const SUBSCRIBE_SUPPRESSION: Duration = Duration::from_secs(60);
const STABLE_SESSION: Duration = Duration::from_secs(60);
const EVENT_CHANNEL_CAPACITY: usize = 1024;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

/// Subscription changes accepted by the feed task.
#[derive(Debug)]
pub enum FeedCommand {
    /// Add tokens to the desired set and subscribe to the new ones.
    Subscribe(Vec<String>),
    /// Drop tokens from the desired set.
    Unsubscribe(Vec<String>),
}

/// Cloneable handle to the feed task.
#[derive(Clone)]
pub struct FeedHandle {
    cmd: mpsc::Sender<FeedCommand>,
    events: broadcast::Sender<FeedEvent>,
    metrics: Arc<FeedMetrics>,
}

impl FeedHandle {
    pub async fn subscribe_tokens(&self, tokens: Vec<String>) {
        let _ = self.cmd.send(FeedCommand::Subscribe(tokens)).await;
    }

    pub async fn unsubscribe_tokens(&self, tokens: Vec<String>) {
        let _ = self.cmd.send(FeedCommand::Unsubscribe(tokens)).await;
    }

    /// A fresh receiver of parsed events. Per-connection order is
    /// preserved; fan-out is best-effort.
    pub fn events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> FeedSnapshot {
        self.metrics.snapshot()
    }
}

/// Spawn the feed task against the given WebSocket URL.
pub fn spawn_feed(
    url: String,
    bus: EventBus,
    cache: MarketCache,
    shutdown: watch::Receiver<bool>,
) -> FeedHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let metrics = Arc::new(FeedMetrics::new());

    let task = FeedTask {
        url,
        bus,
        cache,
        metrics: Arc::clone(&metrics),
        events: event_tx.clone(),
        cmd_rx,
        shutdown,
        subscribed: HashSet::new(),
        last_subscription_at: None,
        order_batch: Vec::new(),
    };
    tokio::spawn(task.run());

    FeedHandle {
        cmd: cmd_tx,
        events: event_tx,
        metrics,
    }
}

enum SessionEnd {
    Shutdown,
    Disconnected,
}

struct FeedTask {
    url: String,
    bus: EventBus,
    cache: MarketCache,
    metrics: Arc<FeedMetrics>,
    events: broadcast::Sender<FeedEvent>,
    cmd_rx: mpsc::Receiver<FeedCommand>,
    shutdown: watch::Receiver<bool>,
    /// Desired subscriptions; survives reconnects.
    subscribed: HashSet<String>,
    last_subscription_at: Option<Instant>,
    order_batch: Vec<Value>,
}

impl FeedTask {
    async fn run(mut self) {
        let mut backoff = Backoff::for_reconnect();
        let mut ever_connected = false;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let ws = tokio::select! {
                biased;
                _ = self.shutdown.changed() => continue,
                connected = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(&self.url)) => {
                    match connected {
                        Ok(Ok((stream, _))) => stream,
                        Ok(Err(e)) => {
                            warn!(error = %e, "feed connect failed");
                            self.metrics.inc_reconnect_attempts();
                            tokio::time::sleep(backoff.next_delay()).await;
                            continue;
                        }
                        Err(_) => {
                            warn!("feed connect timed out");
                            self.metrics.inc_reconnect_attempts();
                            tokio::time::sleep(backoff.next_delay()).await;
                            continue;
                        }
                    }
                }
            };

            let is_reconnect = ever_connected;
            if is_reconnect {
                self.metrics.inc_reconnect_successes();
            }
            ever_connected = true;

            let started = Instant::now();
            let end = self.session(ws, is_reconnect).await;

            self.metrics.set_connected(false);
            self.bus
                .publish(topic::LIVE_ORDERS, BusEvent::Connected { connected: false });

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Disconnected => {
                    if started.elapsed() >= STABLE_SESSION {
                        backoff.reset();
                    }
                    self.metrics.inc_reconnect_attempts();
                    tokio::time::sleep(backoff.next_delay()).await;
                }
            }
        }
        info!("market feed stopped");
    }

    async fn session(&mut self, ws: WsStream, is_reconnect: bool) -> SessionEnd {
        info!(subscriptions = self.subscribed.len(), "market feed connected");
        self.metrics.set_connected(true);
        self.bus
            .publish(topic::LIVE_ORDERS, BusEvent::Connected { connected: true });

        let (mut write, mut read) = ws.split();

        // Re-send the union of desired subscriptions on every connect;
        // after a drop this counts as a retry of the standing set.
        if !self.subscribed.is_empty() {
            if is_reconnect {
                self.metrics.inc_subscription_retries();
            }
            let all: Vec<String> = self.subscribed.iter().cloned().collect();
            self.send_subscribe(&mut write, all, true).await;
        }

        let mut batch_tick = tokio::time::interval(BATCH_FLUSH_PERIOD);
        batch_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut health_tick = tokio::time::interval(HEALTH_PERIOD);
        health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_message_at = Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        let _ = write.close().await;
                        return SessionEnd::Shutdown;
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(FeedCommand::Subscribe(tokens)) => {
                            let requested = tokens.clone();
                            let fresh: Vec<String> = tokens
                                .into_iter()
                                .filter(|t| self.subscribed.insert(t.clone()))
                                .collect();
                            if !fresh.is_empty() {
                                // Genuinely new tokens always go out.
                                self.send_subscribe(&mut write, fresh, true).await;
                            } else if !requested.is_empty() {
                                // A repeat of known tokens is a resend and
                                // is suppressed when one went out recently.
                                self.send_subscribe(&mut write, requested, false).await;
                            }
                        }
                        Some(FeedCommand::Unsubscribe(tokens)) => {
                            for token in &tokens {
                                self.subscribed.remove(token);
                            }
                            debug!(removed = tokens.len(), remaining = self.subscribed.len(),
                                   "dropped subscriptions");
                        }
                        None => {
                            // Every handle dropped: nothing can subscribe
                            // again, treat as shutdown.
                            let _ = write.close().await;
                            return SessionEnd::Shutdown;
                        }
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.metrics.inc_messages();
                            last_message_at = Instant::now();
                            self.handle_text(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                return SessionEnd::Disconnected;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!("feed closed by server");
                            self.flush_batch();
                            return SessionEnd::Disconnected;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "feed read error");
                            self.flush_batch();
                            return SessionEnd::Disconnected;
                        }
                        Some(Ok(_)) => {}
                    }
                }

                _ = batch_tick.tick() => {
                    self.flush_batch();
                }

                _ = health_tick.tick() => {
                    let stale = last_message_at.elapsed() > STALE_AFTER;
                    if stale && !self.subscribed.is_empty() {
                        warn!(silent_for = ?last_message_at.elapsed(), "feed stale, forcing resubscribe");
                        self.metrics.inc_subscription_retries();
                        let all: Vec<String> = self.subscribed.iter().cloned().collect();
                        self.send_subscribe(&mut write, all, true).await;
                    }
                }
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let cache = self.cache.clone();
        let parsed = parse_frame(text, &move |token| cache.lookup(token));
        if parsed.events.is_empty() && parsed.ignored > 0 {
            return;
        }

        self.metrics.add_events(parsed.events.len() as u64);
        for event in parsed.events {
            if let Ok(value) = serde_json::to_value(&event) {
                self.order_batch.push(value);
            }
            // In-process subscribers get every event immediately.
            let _ = self.events.send(event);
        }
        if self.order_batch.len() >= BATCH_MAX {
            self.flush_batch();
        }
    }

    /// Publish buffered order traffic for the UI: a single event goes out
    /// alone, a batch goes out as a list plus per-order events.
    fn flush_batch(&mut self) {
        match self.order_batch.len() {
            0 => {}
            1 => {
                let order = self.order_batch.pop().unwrap_or(Value::Null);
                self.bus
                    .publish(topic::LIVE_ORDERS, BusEvent::NewOrder { order });
            }
            _ => {
                let orders = std::mem::take(&mut self.order_batch);
                for order in &orders {
                    self.bus.publish(
                        topic::LIVE_ORDERS,
                        BusEvent::NewOrder {
                            order: order.clone(),
                        },
                    );
                }
                self.bus
                    .publish(topic::LIVE_ORDERS, BusEvent::NewOrdersBatch { orders });
            }
        }
    }

    /// Send a subscribe payload. Recent sends are suppressed unless the
    /// health check forces a refresh.
    async fn send_subscribe(&mut self, write: &mut WsSink, tokens: Vec<String>, force: bool) {
        if tokens.is_empty() {
            return;
        }
        if !force {
            if let Some(last) = self.last_subscription_at {
                if last.elapsed() < SUBSCRIBE_SUPPRESSION {
                    debug!(tokens = tokens.len(), "subscribe suppressed (sent recently)");
                    return;
                }
            }
        }

        let payload = match serde_json::to_string(&SubscribeRequest::market(&tokens)) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode subscribe payload");
                return;
            }
        };

        self.metrics.inc_subscription_attempts();
        self.last_subscription_at = Some(Instant::now());
        if let Err(e) = write.send(Message::Text(payload)).await {
            warn!(error = %e, "subscribe send failed");
        } else {
            debug!(tokens = tokens.len(), force, "subscribe sent");
        }
    }
}
