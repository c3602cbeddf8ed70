//! Market metadata: the Gamma API fetcher and the TTL cache in front of it.
//!
//! Discovery walks the short-lived market tags (`15M`, `1H`, `4h`,
//! `weekly`), filters server results client-side (order book enabled,
//! crypto keywords, resolution window), de-duplicates by event slug and
//! sorts by end date. Single-token lookups go through [`MarketCache`]
//! with a 300 s TTL.

mod cache;
mod fetcher;
mod gamma;
mod search;

pub use cache::{spawn_sweeper, MarketCache, CACHE_TTL};
pub use fetcher::{DiscoveredToken, MetadataError, MetadataFetcher, ResolutionTag};
pub use gamma::{GammaEvent, GammaMarket};
pub use search::SearchClient;
