//! The strategy engine: a registry of per-strategy runner tasks.
//!
//! [`Engine`] starts and stops one [`Runner`] task per configured
//! strategy and is the authority on liveness: a strategy is running iff
//! its runner is alive in the registry, regardless of the persisted
//! status field. At boot, every strategy whose persisted intent is
//! `running` is started again.
//!
//! The runner drives a per-strategy loop over three inputs: feed events,
//! a five-second tick and a two-minute discovery pulse. The built-in
//! `time_decay` module buys near-certain outcomes close to resolution.

mod engine;
mod error;
mod runner;
mod time_decay;

pub use engine::Engine;
pub use error::EngineError;
pub use runner::RunnerDeps;
pub use time_decay::{TimeDecayConfig, TimeDecayModule, TIME_DECAY_KIND};
