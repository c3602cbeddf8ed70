use thiserror::Error;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A state-dependent operation was refused (e.g. deleting an active
    /// tracked user).
    #[error("{0}")]
    Conflict(String),

    /// A record failed validation before hitting the database.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Auth(#[from] auth::AuthError),

    /// A stored value no longer parses (enum string, decimal, JSON).
    #[error("corrupt {column}: {value}")]
    Corrupt { column: &'static str, value: String },
}
