//! The wallet watcher: polls tracked addresses and publishes new trades.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use event_bus::{topic, BusEvent, EventBus};
use model::{ActivityTrade, Side};
use storage::Store;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use venue_client::{ActivityItem, DataClient};

use crate::error::CopyError;

/// One page of recent activity per poll.
const POLL_FETCH_LIMIT: u32 = 500;

/// Poll interval for N tracked wallets: `max(3 s, 10 s · N / 100)`.
///
/// At one request per wallet per tick this keeps total request rate at or
/// below half the data-API bucket capacity.
pub fn poll_interval(tracked: usize) -> Duration {
    let scaled = Duration::from_millis(100 * tracked as u64);
    scaled.max(Duration::from_secs(3))
}

/// CRUD and scheduling commands for the watcher task.
#[derive(Debug)]
pub enum WatcherCommand {
    /// Upsert and immediately fetch.
    Track { address: String, label: String },
    /// Archive: stop polling, keep the row.
    Untrack { address: String },
    /// Undo an archive and resume polling.
    Restore { address: String },
    /// Permanent removal; refused while still active.
    Delete { address: String },
    /// Out-of-schedule fetch for one wallet.
    FetchNow { address: String },
}

/// Cloneable handle to the watcher task.
#[derive(Clone)]
pub struct WatcherHandle {
    cmd: mpsc::Sender<WatcherCommand>,
}

impl WatcherHandle {
    pub async fn send(&self, cmd: WatcherCommand) {
        let _ = self.cmd.send(cmd).await;
    }
}

/// Spawn the watcher task. Active tracked users are loaded from the store
/// and fetched once immediately.
pub fn spawn_watcher(
    store: Store,
    data: Arc<DataClient>,
    bus: EventBus,
    shutdown: watch::Receiver<bool>,
) -> WatcherHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    tokio::spawn(
        WatcherTask {
            store,
            data,
            bus,
            cmd_rx,
            shutdown,
            labels: HashMap::new(),
            last_trade_ids: HashMap::new(),
        }
        .run(),
    );
    WatcherHandle { cmd: cmd_tx }
}

struct WatcherTask {
    store: Store,
    data: Arc<DataClient>,
    bus: EventBus,
    cmd_rx: mpsc::Receiver<WatcherCommand>,
    shutdown: watch::Receiver<bool>,
    /// Tracked address -> label.
    labels: HashMap<String, String>,
    /// Trade ids seen on the previous poll, per address. Replaced (not
    /// unioned) every poll to bound memory.
    last_trade_ids: HashMap<String, HashSet<String>>,
}

impl WatcherTask {
    async fn run(mut self) {
        match self.store.tracked_users(true) {
            Ok(users) => {
                for user in users {
                    self.labels.insert(user.address.clone(), user.label);
                }
            }
            Err(e) => warn!(error = %e, "failed to load tracked users"),
        }
        info!(tracked = self.labels.len(), "wallet watcher started");

        // Immediate first fetch for everything loaded at boot.
        let initial: Vec<String> = self.labels.keys().cloned().collect();
        for address in initial {
            self.fetch_and_publish(&address).await;
        }

        loop {
            let sleep = poll_interval(self.labels.len());
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if let Err(e) = self.handle_command(cmd).await {
                                warn!(error = %e, "watcher command failed");
                            }
                        }
                        None => break,
                    }
                }

                _ = tokio::time::sleep(sleep) => {
                    let addresses: Vec<String> = self.labels.keys().cloned().collect();
                    for address in addresses {
                        self.fetch_and_publish(&address).await;
                    }
                }
            }
        }
        info!("wallet watcher stopped");
    }

    async fn handle_command(&mut self, cmd: WatcherCommand) -> Result<(), CopyError> {
        match cmd {
            WatcherCommand::Track { address, label } => {
                let user = self.store.track_user(&address, &label)?;
                self.labels.insert(user.address.clone(), user.label);
                self.fetch_and_publish(&user.address).await;
            }
            WatcherCommand::Untrack { address } => {
                let address = address.to_lowercase();
                self.store.untrack_user(&address)?;
                self.labels.remove(&address);
                self.last_trade_ids.remove(&address);
            }
            WatcherCommand::Restore { address } => {
                let address = address.to_lowercase();
                self.store.restore_user(&address)?;
                if let Some(user) = self.store.tracked_user(&address)? {
                    self.labels.insert(user.address.clone(), user.label);
                }
                self.fetch_and_publish(&address).await;
            }
            WatcherCommand::Delete { address } => {
                self.store.delete_tracked_user(&address)?;
            }
            WatcherCommand::FetchNow { address } => {
                self.fetch_and_publish(&address.to_lowercase()).await;
            }
        }
        Ok(())
    }

    /// One poll for one wallet: fetch, extract, diff, publish.
    async fn fetch_and_publish(&mut self, address: &str) {
        let items = match self.data.activity(address, POLL_FETCH_LIMIT, None).await {
            Ok(items) => items,
            Err(e) => {
                warn!(address = %address, error = %e, "activity fetch failed");
                return;
            }
        };

        let trades = extract_trades(address, &items);
        let seen = self.last_trade_ids.entry(address.to_string()).or_default();
        let fresh = diff_new(&trades, seen);

        for trade in &fresh {
            debug!(address = %address, trade_id = %trade.id, side = ?trade.side, "new trade");
            self.bus.publish(
                topic::COPY_TRADING,
                BusEvent::NewTrade {
                    address: address.to_string(),
                    trade: (*trade).clone(),
                },
            );
        }

        // Replace, never union: the long tail of history stays bounded.
        *seen = trades.iter().map(|t| t.id.clone()).collect();

        self.bus.publish(
            topic::COPY_TRADING,
            BusEvent::TradesUpdated {
                address: address.to_string(),
                trades,
            },
        );
    }
}

/// Keep `TRADE` rows with a usable identity and amounts, projected into
/// the canonical record.
pub(crate) fn extract_trades(address: &str, items: &[ActivityItem]) -> Vec<ActivityTrade> {
    items
        .iter()
        .filter(|item| item.kind == "TRADE" && !item.transaction_hash.is_empty())
        .filter_map(|item| {
            let side = Side::from_venue_str(&item.side)?;
            Some(ActivityTrade {
                id: item.transaction_hash.clone(),
                address: address.to_string(),
                market: item.condition_id.clone(),
                asset_id: item.asset.clone(),
                side,
                size: item.size?,
                price: item.price?,
                outcome: item.outcome.clone(),
                title: item.title.clone(),
                event_slug: item.event_slug.clone(),
                timestamp: item.timestamp,
            })
        })
        .collect()
}

/// Trades not present in the previously seen id set.
pub(crate) fn diff_new<'a>(
    trades: &'a [ActivityTrade],
    seen: &HashSet<String>,
) -> Vec<&'a ActivityTrade> {
    trades.iter().filter(|t| !seen.contains(&t.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: &str, hash: &str, side: &str) -> ActivityItem {
        serde_json::from_str(&format!(
            r#"{{"type": "{kind}", "transactionHash": "{hash}", "side": "{side}",
                 "asset": "123", "conditionId": "0xcond", "size": 10, "price": 0.5,
                 "outcome": "Yes", "title": "?", "eventSlug": "q", "timestamp": 1}}"#
        ))
        .unwrap()
    }

    #[test]
    fn extraction_keeps_only_trades() {
        let items = vec![
            item("TRADE", "0xa", "BUY"),
            item("REDEEM", "0xb", "BUY"),
            item("TRADE", "", "BUY"),
            item("TRADE", "0xc", "SELL"),
            item("TRADE", "0xd", "MERGE"),
        ];
        let trades = extract_trades("0xwallet", &items);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].id, "0xa");
        assert_eq!(trades[1].id, "0xc");
        assert_eq!(trades[0].address, "0xwallet");
    }

    #[test]
    fn diff_finds_only_unseen_ids() {
        let items = vec![item("TRADE", "0xa", "BUY"), item("TRADE", "0xb", "SELL")];
        let trades = extract_trades("0xw", &items);

        let mut seen = HashSet::new();
        seen.insert("0xa".to_string());

        let fresh = diff_new(&trades, &seen);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "0xb");
    }

    #[test]
    fn seen_set_replacement_drops_the_tail() {
        // After a poll the seen set equals exactly the current page's ids,
        // so ids that fell off the page are forgotten.
        let current = extract_trades("0xw", &[item("TRADE", "0xnew", "BUY")]);
        let seen: HashSet<String> = current.iter().map(|t| t.id.clone()).collect();
        assert_eq!(seen.len(), 1);
        assert!(seen.contains("0xnew"));
    }

    #[test]
    fn poll_interval_scales_with_tracked_count() {
        assert_eq!(poll_interval(0), Duration::from_secs(3));
        assert_eq!(poll_interval(10), Duration::from_secs(3));
        assert_eq!(poll_interval(30), Duration::from_secs(3));
        assert_eq!(poll_interval(50), Duration::from_secs(5));
        assert_eq!(poll_interval(100), Duration::from_secs(10));
        assert_eq!(poll_interval(200), Duration::from_secs(20));
    }
}
