//! Upstream endpoints and process configuration.

use std::fmt;

/// The set of upstream hosts the server talks to.
///
/// Production values are the venue's public endpoints; tests override
/// individual fields to point at local mock servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueEndpoints {
    /// Central limit order book REST host (authenticated).
    pub clob: String,
    /// Public data API host (positions, activity).
    pub data_api: String,
    /// Gamma metadata API host (events, markets).
    pub gamma: String,
    /// Full-text search host.
    pub search: String,
    /// Market-channel WebSocket URL.
    pub market_ws: String,
}

impl Default for VenueEndpoints {
    fn default() -> Self {
        Self {
            clob: "https://clob.polymarket.com".to_string(),
            data_api: "https://data-api.polymarket.com".to_string(),
            gamma: "https://gamma-api.polymarket.com".to_string(),
            search: "https://search-api.polymarket.com".to_string(),
            market_ws: "wss://ws-subscriptions-clob.polymarket.com/ws/market".to_string(),
        }
    }
}

impl fmt::Display for VenueEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clob={} data={} gamma={}", self.clob, self.data_api, self.gamma)
    }
}

/// Process-level configuration from the environment.
#[derive(Debug, Clone)]
pub struct ProcessEnv {
    /// Path of the embedded database file (`DATABASE_PATH`).
    pub database_path: String,
    /// HTTP port for the UI surface (`PORT`).
    pub port: u16,
}

impl ProcessEnv {
    /// Read configuration from environment variables, with local defaults.
    pub fn from_env() -> Self {
        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "trading_server.db".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(4000);
        Self {
            database_path,
            port,
        }
    }
}
