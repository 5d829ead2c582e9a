//! veogen Core Library
//!
//! Shared functionality for veogen components:
//! - Job request model and task identifiers
//! - Client-visible task events
//! - Provider response normalization and progress parsing
//! - Failure classification
//! - Configuration resolution and tracing setup

pub mod config;
pub mod error;
pub mod events;
pub mod failure;
pub mod normalize;
pub mod progress;
pub mod task;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{CompletionRecord, FailureKind, FailureRecord, ProgressEvent, TaskEvent};
pub use task::{AspectRatio, DurationHint, ImageRef, JobRequest, TaskId};
