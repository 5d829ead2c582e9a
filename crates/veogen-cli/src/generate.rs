//! One-shot generation: submit a job and block until its terminal event.

use tracing::info;

use veogen_core::{CompletionRecord, JobRequest, ProgressEvent, TaskEvent};
use veogen_daemon::relay::{RelayError, TaskRelay};

/// Submit `request` and wait for it, calling `on_progress` for each progress
/// event. Resolves to the completion record or the task's failure.
pub async fn run(
    relay: &TaskRelay,
    request: JobRequest,
    mut on_progress: impl FnMut(&ProgressEvent),
) -> Result<CompletionRecord, RelayError> {
    let (task_id, mut subscription) = relay.submit_and_subscribe(request).await?;
    info!(%task_id, "Task started");

    while let Some(event) = subscription.recv().await {
        match event {
            TaskEvent::Progress(progress) => on_progress(&progress),
            TaskEvent::Complete(record) => return Ok(record),
            TaskEvent::Error(record) => return Err(RelayError::Failed(record)),
        }
    }
    Err(RelayError::Interrupted(task_id))
}

/// One progress line, e.g. `[ 42%] Generating frames`.
pub fn render_progress(progress: &ProgressEvent) -> String {
    format!("[{:>3}%] {}", progress.percent, progress.message)
}
