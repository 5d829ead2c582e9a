//! Per-task event subscriptions.
//!
//! Routes each task's progress and terminal events to that task's
//! subscribers only.

mod listeners;
mod state;
mod types;

pub use listeners::TaskRegistry;
pub use types::{RegistryConfig, RegistryError, RegistryStats, TaskSubscription};
