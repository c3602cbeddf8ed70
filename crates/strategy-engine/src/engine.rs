//! The engine registry.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use model::StrategyStatus;
use storage::StrategyRow;
use strategy_core::{BoxedModule, ModuleError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::runner::{Runner, RunnerCommand, RunnerDeps};
use crate::time_decay::{TimeDecayModule, TIME_DECAY_KIND};

/// How long a stopping runner gets to drain before it is aborted.
const STOP_GRACE: Duration = Duration::from_secs(10);

/// Timeout for best-effort runner queries.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

struct RunnerEntry {
    shutdown: watch::Sender<bool>,
    commands: mpsc::Sender<RunnerCommand>,
    handle: JoinHandle<()>,
}

/// Supervisor and registry of runner tasks. Cheap to clone.
///
/// Registry membership is the authoritative liveness signal; the
/// persisted `status` column only records the last intent.
#[derive(Clone)]
pub struct Engine {
    deps: RunnerDeps,
    runners: Arc<DashMap<i64, RunnerEntry>>,
}

impl Engine {
    pub fn new(deps: RunnerDeps) -> Self {
        Self {
            deps,
            runners: Arc::new(DashMap::new()),
        }
    }

    /// Launch a runner for the strategy. Fails when the strategy does not
    /// exist, its type is unknown, or it is already running.
    pub async fn start_strategy(&self, id: i64) -> Result<(), EngineError> {
        self.prune_finished();
        if self.is_running(id) {
            return Err(EngineError::AlreadyRunning(id));
        }

        let row = self
            .deps
            .store
            .strategy(id)?
            .ok_or(EngineError::NotFound(id))?;
        let module = build_module(&row)?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let runner = Runner::new(row, module, self.deps.clone());
        let handle = tokio::spawn(runner.run(shutdown_rx, cmd_rx));

        self.runners.insert(
            id,
            RunnerEntry {
                shutdown: shutdown_tx,
                commands: cmd_tx,
                handle,
            },
        );
        info!(strategy_id = id, "strategy started");
        Ok(())
    }

    /// Stop a running strategy and wait for its runner to drain.
    pub async fn stop_strategy(&self, id: i64) -> Result<(), EngineError> {
        let (_, entry) = self
            .runners
            .remove(&id)
            .ok_or(EngineError::NotRunning(id))?;
        let _ = entry.shutdown.send(true);

        let abort = entry.handle.abort_handle();
        if tokio::time::timeout(STOP_GRACE, entry.handle).await.is_err() {
            warn!(strategy_id = id, "runner did not stop in time, aborting");
            abort.abort();
        }
        info!(strategy_id = id, "strategy stopped");
        Ok(())
    }

    /// Whether a live runner exists for this strategy.
    pub fn is_running(&self, id: i64) -> bool {
        self.runners
            .get(&id)
            .map(|entry| !entry.handle.is_finished())
            .unwrap_or(false)
    }

    /// Strategies with a live runner.
    pub fn running_ids(&self) -> Vec<i64> {
        self.runners
            .iter()
            .filter(|entry| !entry.handle.is_finished())
            .map(|entry| *entry.key())
            .collect()
    }

    pub async fn pause_strategy(&self, id: i64) -> Result<(), EngineError> {
        self.send_command(id, RunnerCommand::Pause).await
    }

    pub async fn resume_strategy(&self, id: i64) -> Result<(), EngineError> {
        self.send_command(id, RunnerCommand::Resume).await
    }

    /// Snapshot of a runner's discovered token set. Best-effort: a dead
    /// or busy runner yields an empty list, never an error.
    pub async fn discovered_tokens(&self, id: i64) -> Vec<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = match self.runners.get(&id) {
            Some(entry) => entry
                .commands
                .send(RunnerCommand::GetDiscovered(reply_tx))
                .await
                .is_ok(),
            None => false,
        };
        if !sent {
            return Vec::new();
        }
        match tokio::time::timeout(QUERY_TIMEOUT, reply_rx).await {
            Ok(Ok(tokens)) => tokens,
            _ => Vec::new(),
        }
    }

    /// Start every strategy whose persisted intent is `running`. Called
    /// once at boot; returns the number of runners launched.
    pub async fn auto_start(&self) -> usize {
        let rows = match self.deps.store.strategies_with_status(StrategyStatus::Running) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "auto-start query failed");
                return 0;
            }
        };

        let mut started = 0;
        for row in rows {
            match self.start_strategy(row.id).await {
                Ok(()) => started += 1,
                Err(e) => {
                    warn!(strategy_id = row.id, error = %e, "auto-start failed");
                    let _ = self
                        .deps
                        .store
                        .update_strategy_status(row.id, StrategyStatus::Error);
                }
            }
        }
        info!(started, "auto-start complete");
        started
    }

    /// Stop every runner; used during server shutdown.
    pub async fn shutdown_all(&self) {
        let ids: Vec<i64> = self.runners.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Err(e) = self.stop_strategy(id).await {
                warn!(strategy_id = id, error = %e, "shutdown stop failed");
            }
        }
    }

    async fn send_command(&self, id: i64, cmd: RunnerCommand) -> Result<(), EngineError> {
        let entry = self.runners.get(&id).ok_or(EngineError::NotRunning(id))?;
        entry
            .commands
            .send(cmd)
            .await
            .map_err(|_| EngineError::NotRunning(id))
    }

    /// Drop registry entries whose tasks already finished (crashed
    /// runners persist `error` themselves before exiting).
    fn prune_finished(&self) {
        self.runners.retain(|_, entry| !entry.handle.is_finished());
    }
}

/// The single dispatch point from a persisted strategy type to a module.
fn build_module(row: &StrategyRow) -> Result<BoxedModule, ModuleError> {
    match row.kind.as_str() {
        TIME_DECAY_KIND => Ok(Box::new(TimeDecayModule::from_config(&row.config)?)),
        other => Err(ModuleError::UnknownStrategyType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::EventBus;
    use market_feed::spawn_feed;
    use metadata::{MarketCache, MetadataFetcher};
    use rate_limit::RateLimiter;
    use serde_json::json;
    use storage::Store;
    use venue_client::ClobClient;

    fn deps() -> RunnerDeps {
        let store = Store::open_in_memory().unwrap();
        let limiter = RateLimiter::start();
        let cache = MarketCache::new();
        let (_, shutdown_rx) = watch::channel(false);
        // The feed points at an unreachable host; connect attempts fail
        // and back off in the background, which is fine for these tests.
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
            clob: Arc::new(
                ClobClient::new("https://clob.invalid", store, limiter).unwrap(),
            ),
            feed,
            bus: EventBus::new(),
        }
    }

    #[tokio::test]
    async fn unknown_strategy_id_is_rejected() {
        let engine = Engine::new(deps());
        assert!(matches!(
            engine.start_strategy(42).await,
            Err(EngineError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn unknown_strategy_type_is_rejected() {
        let engine = Engine::new(deps());
        let row = engine
            .deps
            .store
            .insert_strategy("mystery", "martingale", &json!({}), true)
            .unwrap();
        assert!(matches!(
            engine.start_strategy(row.id).await,
            Err(EngineError::Module(ModuleError::UnknownStrategyType(_)))
        ));
    }

    #[tokio::test]
    async fn registry_is_the_liveness_authority() {
        let engine = Engine::new(deps());
        let row = engine
            .deps
            .store
            .insert_strategy("decay", TIME_DECAY_KIND, &json!({"intervals": ["15m"]}), true)
            .unwrap();

        // Persisted intent says running, but no runner is alive.
        engine
            .deps
            .store
            .update_strategy_status(row.id, StrategyStatus::Running)
            .unwrap();
        assert!(!engine.is_running(row.id));

        engine.start_strategy(row.id).await.unwrap();
        assert!(engine.is_running(row.id));
        assert_eq!(engine.running_ids(), vec![row.id]);

        // Double start is refused while the runner lives.
        assert!(matches!(
            engine.start_strategy(row.id).await,
            Err(EngineError::AlreadyRunning(_))
        ));

        engine.stop_strategy(row.id).await.unwrap();
        assert!(!engine.is_running(row.id));
        assert_eq!(
            engine.deps.store.strategy(row.id).unwrap().unwrap().status,
            StrategyStatus::Stopped
        );
    }

    #[tokio::test]
    async fn auto_start_revives_persisted_running_strategies() {
        let engine = Engine::new(deps());
        let running = engine
            .deps
            .store
            .insert_strategy("a", TIME_DECAY_KIND, &json!({"intervals": ["15m"]}), true)
            .unwrap();
        let stopped = engine
            .deps
            .store
            .insert_strategy("b", TIME_DECAY_KIND, &json!({"intervals": ["1h"]}), true)
            .unwrap();
        engine
            .deps
            .store
            .update_strategy_status(running.id, StrategyStatus::Running)
            .unwrap();

        assert_eq!(engine.auto_start().await, 1);
        assert!(engine.is_running(running.id));
        assert!(!engine.is_running(stopped.id));

        engine.shutdown_all().await;
    }

    #[tokio::test]
    async fn discovered_tokens_is_empty_for_dead_runners() {
        let engine = Engine::new(deps());
        assert!(engine.discovered_tokens(7).await.is_empty());
    }
}
