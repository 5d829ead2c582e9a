//! Relay module types.

use std::time::Duration;

use veogen_core::config::GatewayConfig;
use veogen_core::{FailureRecord, TaskId};

use crate::registry::RegistryError;

/// Configuration for running tasks.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Deadline for one task's gateway work, image staging included.
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

impl From<&GatewayConfig> for RelayConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }
}

/// Errors from relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The request failed validation; no task was started.
    #[error(transparent)]
    Rejected(#[from] veogen_core::Error),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The task ran and ended with a failure record.
    #[error("{0}")]
    Failed(FailureRecord),

    #[error("Event stream for task {0} ended without a terminal event")]
    Interrupted(TaskId),
}
