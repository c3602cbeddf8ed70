use thiserror::Error;

/// Errors a strategy module can raise. The runner converts these into
/// event-log entries; they never crash the runner.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The persisted config is unusable for this module type.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured strategy type is not known to the engine.
    #[error("unknown strategy type: {0}")]
    UnknownStrategyType(String),

    /// Anything else; carried into the event log verbatim.
    #[error("{0}")]
    Internal(String),
}
