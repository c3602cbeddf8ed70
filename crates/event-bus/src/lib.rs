//! In-process topic pub/sub.
//!
//! Producers publish [`BusEvent`]s onto named topics; subscribers get a
//! broadcast receiver per topic. Delivery is best-effort within the
//! process: a subscriber that falls behind loses the oldest messages, and
//! publishing to a topic nobody listens on is a no-op. Nothing is
//! persisted.

use std::sync::Arc;

use dashmap::DashMap;
use model::ActivityTrade;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Topic names used across the server.
pub mod topic {
    /// Watcher and executor traffic (new trades, copy results).
    pub const COPY_TRADING: &str = "copy_trading";
    /// Engine-wide strategy lifecycle updates.
    pub const STRATEGY_UPDATES: &str = "strategies:updates";
    /// Raw feed traffic for the live-orders view.
    pub const LIVE_ORDERS: &str = "polymarket:live_orders";

    /// Per-strategy stream.
    pub fn strategy(id: i64) -> String {
        format!("strategies:{id}")
    }
}

/// Everything the UI (or another in-process consumer) can observe.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A tracked wallet made a trade not seen before.
    NewTrade {
        address: String,
        trade: ActivityTrade,
    },
    /// Full refreshed trade list for a tracked wallet.
    TradesUpdated {
        address: String,
        trades: Vec<ActivityTrade>,
    },
    /// A copy order finished (executed, simulated or failed).
    CopyTradeExecuted {
        copy_trade_id: i64,
        status: String,
    },
    /// Market feed connectivity changed.
    Connected { connected: bool },
    /// Discovery added tokens to a runner.
    DiscoveredTokens {
        strategy_id: i64,
        tokens: Vec<String>,
    },
    /// Discovery dropped tokens from a runner.
    RemovedTokens {
        strategy_id: i64,
        tokens: Vec<String>,
    },
    /// Coalesced price snapshot from a runner.
    PriceUpdate {
        strategy_id: i64,
        prices: Value,
    },
    /// A strategy produced a signal.
    Signal {
        strategy_id: i64,
        signal: Value,
    },
    /// An order was executed (paper or live) with its trade snapshot.
    PaperOrder {
        strategy_id: i64,
        trade: Value,
        paper_mode: bool,
    },
    /// Runner lifecycle change.
    StrategyStatus {
        strategy_id: i64,
        status: String,
    },
    /// One market-feed order event.
    NewOrder { order: Value },
    /// A batch of market-feed order events.
    NewOrdersBatch { orders: Vec<Value> },
}

const TOPIC_CAPACITY: usize = 256;

/// Topic-keyed broadcaster. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventBus {
    topics: Arc<DashMap<String, broadcast::Sender<BusEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish onto a topic. Returns the number of receivers reached.
    pub fn publish(&self, topic: &str, event: BusEvent) -> usize {
        match self.topics.get(topic) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Subscribe to a topic, creating it on first use.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusEvent> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Side;
    use rust_decimal_macros::dec;

    fn trade() -> ActivityTrade {
        ActivityTrade {
            id: "0xhash".into(),
            address: "0xabc".into(),
            market: "0xcond".into(),
            asset_id: "123".into(),
            side: Side::Buy,
            size: dec!(10),
            price: dec!(0.5),
            outcome: "Yes".into(),
            title: "?".into(),
            event_slug: "q".into(),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn subscribers_receive_their_topic_only() {
        let bus = EventBus::new();
        let mut copy_rx = bus.subscribe(topic::COPY_TRADING);
        let mut live_rx = bus.subscribe(topic::LIVE_ORDERS);

        bus.publish(
            topic::COPY_TRADING,
            BusEvent::NewTrade {
                address: "0xabc".into(),
                trade: trade(),
            },
        );

        assert!(matches!(copy_rx.recv().await.unwrap(), BusEvent::NewTrade { .. }));
        assert!(live_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_noop() {
        let bus = EventBus::new();
        assert_eq!(
            bus.publish(topic::STRATEGY_UPDATES, BusEvent::Connected { connected: true }),
            0
        );
    }

    #[tokio::test]
    async fn per_strategy_topics_are_isolated() {
        let bus = EventBus::new();
        let mut one = bus.subscribe(&topic::strategy(1));
        let mut two = bus.subscribe(&topic::strategy(2));

        bus.publish(
            &topic::strategy(1),
            BusEvent::StrategyStatus {
                strategy_id: 1,
                status: "running".into(),
            },
        );

        assert!(one.try_recv().is_ok());
        assert!(two.try_recv().is_err());
    }
}
