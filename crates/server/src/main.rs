//! Trading automation server.
//!
//! Boot order: environment, logging, database migrations, then the
//! long-lived tasks — rate limiter, market cache sweeper, market feed,
//! wallet watcher, copy executor, strategy engine (with auto-start of
//! every strategy whose persisted intent is `running`). Ctrl+C flips the
//! shutdown channel; every task drains and persists terminal state
//! before the process exits.
//!
//! Environment:
//! - `DATABASE_PATH` - sqlite file location (default `trading_server.db`)
//! - `PORT`          - UI port (the web layer binds it, not the core)
//! - `RUST_LOG`      - log filter (default `info`)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::{init_logging, ProcessEnv, VenueEndpoints};
use copytrade::{spawn_watcher, CopyExecutor};
use event_bus::EventBus;
use market_feed::spawn_feed;
use metadata::{spawn_sweeper, MarketCache, MetadataFetcher};
use rate_limit::RateLimiter;
use storage::Store;
use strategy_engine::{Engine, RunnerDeps};
use tokio::sync::watch;
use tracing::{error, info, warn};
use venue_client::{ClobClient, DataClient};

/// Interval of the periodic health log line.
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    match dotenvy::dotenv() {
        Ok(path) => eprintln!("loaded environment from {}", path.display()),
        Err(dotenvy::Error::Io(_)) => {}
        Err(e) => eprintln!("warning: failed to load .env: {e}"),
    }
    init_logging();

    if let Err(e) = run().await {
        error!(error = %e, "server aborted");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let env = ProcessEnv::from_env();
    let endpoints = VenueEndpoints::default();
    info!(
        database = %env.database_path,
        port = env.port,
        endpoints = %endpoints,
        "starting trading server"
    );

    let store = Store::open(&env.database_path).context("opening database")?;
    match store.credentials()? {
        Some(creds) if creds.configured() => {
            info!(wallet = %creds.wallet_address, "credentials configured, live trading available");
        }
        _ => {
            info!("no credentials configured, orders will be simulated until keys are saved");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let limiter = RateLimiter::start();
    let bus = EventBus::new();

    let cache = MarketCache::new();
    let sweeper = spawn_sweeper(cache.clone());

    let clob = Arc::new(
        ClobClient::new(&endpoints.clob, store.clone(), limiter.clone())
            .context("building CLOB client")?,
    );
    let data = Arc::new(
        DataClient::new(&endpoints.data_api, limiter.clone()).context("building data client")?,
    );
    let fetcher = Arc::new(
        MetadataFetcher::new(&endpoints.gamma, limiter.clone(), cache.clone())
            .context("building metadata fetcher")?,
    );

    // Startup probes: purely informational.
    clob.log_clock_skew().await;
    match clob.balance().await {
        Ok(balance) => info!(balance = %balance, "collateral balance"),
        Err(e) => warn!(error = %e, "balance probe failed"),
    }

    let feed = spawn_feed(
        endpoints.market_ws.clone(),
        bus.clone(),
        cache.clone(),
        shutdown_rx.clone(),
    );

    let _watcher = spawn_watcher(
        store.clone(),
        Arc::clone(&data),
        bus.clone(),
        shutdown_rx.clone(),
    );

    let executor = CopyExecutor::new(store.clone(), Arc::clone(&clob), bus.clone());
    let executor_handle = tokio::spawn(executor.run(shutdown_rx.clone()));

    let engine = Engine::new(RunnerDeps {
        store: store.clone(),
        fetcher: Arc::clone(&fetcher),
        clob: Arc::clone(&clob),
        feed: feed.clone(),
        bus: bus.clone(),
    });
    let revived = engine.auto_start().await;
    if revived > 0 {
        info!(revived, "restarted strategies from persisted state");
    }

    // Ctrl+C flips the shutdown channel for every task.
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
            let _ = ctrl_c_tx.send(true);
        }
    });

    // Periodic health line with feed counters.
    let health_feed = feed.clone();
    let mut health_shutdown = shutdown_rx.clone();
    let health = tokio::spawn(async move {
        let mut tick = tokio::time::interval(HEALTH_LOG_INTERVAL);
        tick.tick().await;
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let snap = health_feed.metrics();
                    info!(
                        connected = snap.connected,
                        messages = snap.messages_received,
                        events = snap.events_emitted,
                        parse_errors = snap.parse_errors,
                        reconnects = snap.reconnect_attempts,
                        subscription_retries = snap.subscription_retries,
                        "health"
                    );
                }
                _ = health_shutdown.changed() => {
                    if *health_shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    });

    info!("trading server running");

    // Wait for shutdown.
    let mut wait_shutdown = shutdown_rx.clone();
    while !*wait_shutdown.borrow() {
        if wait_shutdown.changed().await.is_err() {
            break;
        }
    }

    // Drain: strategies first (they persist status), then the rest.
    engine.shutdown_all().await;
    let _ = executor_handle.await;
    health.abort();
    sweeper.abort();

    info!("shutdown complete");
    Ok(())
}
