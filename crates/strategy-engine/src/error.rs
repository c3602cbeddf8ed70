use thiserror::Error;

/// Errors from engine registry operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] storage::StoreError),

    #[error(transparent)]
    Module(#[from] strategy_core::ModuleError),

    #[error("strategy {0} not found")]
    NotFound(i64),

    #[error("strategy {0} is already running")]
    AlreadyRunning(i64),

    #[error("strategy {0} is not running")]
    NotRunning(i64),
}
