//! Relay module: bridges one remote job to its task's subscribers.
//!
//! This is the glue that connects:
//! - `Gateway` (image staging, job submission, raw progress payloads)
//! - the normalizers in `veogen_core` (progress percent, video URL, failures)
//! - `TaskRegistry` (per-task event fan-out)

mod pipeline;
mod types;

pub use pipeline::{STARTING_MESSAGE, TaskRelay};
pub use types::{RelayConfig, RelayError};
