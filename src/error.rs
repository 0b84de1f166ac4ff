//! Lingodrill Error Types
//!
//! Centralized error handling for the drill engine.

use thiserror::Error;

/// Central error type for Lingodrill
#[derive(Error, Debug)]
pub enum DrillError {
    #[error("Speech recognition unavailable: {0}")]
    Recognition(String),

    #[error("Recognition timed out before producing a result")]
    RecognitionTimeout,

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed snapshot: {0}")]
    Snapshot(String),

    #[error("Dialogue content error: {0}")]
    Content(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Lock poisoned: {0}")]
    Lock(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Lingodrill operations
pub type DrillResult<T> = Result<T, DrillError>;

/// Helper to convert Mutex poison errors
impl<T> From<std::sync::PoisonError<T>> for DrillError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        DrillError::Lock(err.to_string())
    }
}
