//! Error types for veogen core library.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using veogen Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for veogen operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Request rejected before a task was started.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider response carried no recognizable video URL.
    #[error("Video URL not found in API response (keys: {})", keys.join(", "))]
    ResponseShape { keys: Vec<String> },

    /// The remote gateway rejected the job.
    #[error("Gateway error: {message}")]
    Gateway {
        message: String,
        status: Option<u16>,
        detail: Option<serde_json::Value>,
    },

    /// The remote call exceeded the configured deadline.
    #[error("Gateway call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The task's job future stopped without producing a result.
    #[error("Video generation aborted: {0}")]
    Aborted(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
