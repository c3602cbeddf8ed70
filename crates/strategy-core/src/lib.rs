//! The strategy plug-in interface.
//!
//! A strategy module reacts to order-book events and periodic ticks and
//! answers with [`Signal`]s for its runner to execute. The runner owns
//! discovery, subscriptions, persistence and execution; the module owns
//! only the decision logic. Callbacks are cooperative and must not block
//! the runner's message loop.

mod error;
mod module;
mod signal;

pub use error::ModuleError;
pub use module::{BoxedModule, ModuleContext, StrategyModule};
pub use signal::{Signal, SignalAction};
