//! Error types for the rating engine
//!
//! Run-fatal conditions are modelled as `EngineError` variants and carried
//! through `anyhow` so callers can classify them with `downcast_ref`.
//! Per-game data problems, including corrupt game records, are never errors;
//! the processor turns them into skipped-game entries on the run summary.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific engine scenarios
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Season not found: {season_id}")]
    SeasonNotFound { season_id: String },

    #[error("A calculation run is already in progress for season {season_id}")]
    RunInProgress { season_id: String },

    #[error("Ranking persistence failed after {batches_committed} committed batches: {message}")]
    PersistenceFailed {
        message: String,
        batches_committed: usize,
    },

    #[error("Invalid run request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal engine error: {message}")]
    InternalError { message: String },
}
