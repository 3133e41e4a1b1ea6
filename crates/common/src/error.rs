//! Unified error type for the service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No series exists for the key and the provider produced no data.
    #[error("no data for location: {0}")]
    NotFound(String),

    #[error("not enough history to predict: have {have}, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Provider or store transport failure; fatal only for the operation
    /// in progress.
    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("invalid reading: {0}")]
    InvalidReading(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
