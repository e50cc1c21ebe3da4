// Error types for the metrics subsystem
// Storage failures, client input validation and health composition errors
// all flow through MetricsError

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("persist failed for {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid accuracy result '{0}'; expected one of: correct, incorrect, unknown")]
    InvalidAccuracy(String),
    #[error("metrics unavailable: {0}")]
    Unavailable(String),
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;
