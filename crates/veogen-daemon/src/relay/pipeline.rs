//! Task relay pipeline: gateway ↔ subscriber event bridging.
//!
//! Data flow:
//! ```text
//! JobRequest → stage image → Gateway::subscribe ─┬→ raw progress → ProgressEvent → registry
//!                                                └→ raw result → CompletionRecord → registry
//! ```
//!
//! Every task ends with exactly one terminal event, even when the job panics.
//! Staged images are removed before that event is published.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use veogen_core::normalize::normalize_response;
use veogen_core::progress::{normalize_percent, progress_message};
use veogen_core::{
    CompletionRecord, Error, FailureRecord, JobRequest, ProgressEvent, TaskEvent, TaskId,
};

use crate::gateway::{Gateway, GatewayInput, ImageUpload};
use crate::registry::{TaskRegistry, TaskSubscription};
use crate::staging;

use super::types::{RelayConfig, RelayError};

/// Message of the progress event published when a task starts.
pub const STARTING_MESSAGE: &str = "Starting video generation";

const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Task relay: validates requests, runs each as an independent async task and
/// publishes its events to the registry.
pub struct TaskRelay {
    gateway: Arc<dyn Gateway>,
    registry: Arc<TaskRegistry>,
    config: RelayConfig,
}

impl TaskRelay {
    /// Create a new task relay.
    pub fn new(gateway: Arc<dyn Gateway>, registry: Arc<TaskRegistry>, config: RelayConfig) -> Self {
        Self {
            gateway,
            registry,
            config,
        }
    }

    pub const fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Validate and start a job, returning its id without waiting for it.
    pub async fn submit(&self, request: JobRequest) -> Result<TaskId, RelayError> {
        let task_id = self.accept(&request).await?;
        self.spawn(task_id.clone(), request);
        Ok(task_id)
    }

    /// Like [`submit`](Self::submit), with a subscription attached before the
    /// job starts so no event can be missed.
    pub async fn submit_and_subscribe(
        &self,
        request: JobRequest,
    ) -> Result<(TaskId, TaskSubscription), RelayError> {
        let task_id = self.accept(&request).await?;
        let subscription = match self.registry.subscribe(&task_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.registry.remove(&task_id).await;
                discard_image(&task_id, &request).await;
                return Err(e.into());
            }
        };
        self.spawn(task_id.clone(), request);
        Ok((task_id, subscription))
    }

    /// Run a job and wait for its terminal event.
    pub async fn generate(&self, request: JobRequest) -> Result<CompletionRecord, RelayError> {
        let (task_id, subscription) = self.submit_and_subscribe(request).await?;
        match subscription.wait_terminal().await {
            Some(TaskEvent::Complete(record)) => Ok(record),
            Some(TaskEvent::Error(record)) => Err(RelayError::Failed(record)),
            Some(TaskEvent::Progress(_)) | None => Err(RelayError::Interrupted(task_id)),
        }
    }

    /// Validate and register a request. A staged image of a rejected request
    /// is removed.
    async fn accept(&self, request: &JobRequest) -> Result<TaskId, RelayError> {
        let task_id = TaskId::generate();
        if let Err(e) = request.validate() {
            debug!(error = %e, "Request rejected");
            discard_image(&task_id, request).await;
            return Err(e.into());
        }
        self.registry.register(&task_id).await;
        Ok(task_id)
    }

    fn spawn(&self, task_id: TaskId, request: JobRequest) {
        info!(
            %task_id,
            duration = %request.duration,
            aspect_ratio = %request.aspect_ratio,
            has_image = request.image.is_some(),
            "Task submitted"
        );
        tokio::spawn(run_task(TaskPipelineContext {
            task_id,
            request,
            gateway: Arc::clone(&self.gateway),
            registry: Arc::clone(&self.registry),
            timeout: self.config.timeout,
        }));
    }
}

async fn discard_image(task_id: &TaskId, request: &JobRequest) {
    if let Some(image) = &request.image {
        staging::release(task_id, image).await;
    }
}

/// Everything a spawned task needs.
struct TaskPipelineContext {
    task_id: TaskId,
    request: JobRequest,
    gateway: Arc<dyn Gateway>,
    registry: Arc<TaskRegistry>,
    timeout: Duration,
}

async fn run_task(ctx: TaskPipelineContext) {
    let TaskPipelineContext {
        task_id,
        request,
        gateway,
        registry,
        timeout,
    } = ctx;

    registry
        .publish(TaskEvent::Progress(ProgressEvent {
            task_id: task_id.clone(),
            percent: 0,
            message: STARTING_MESSAGE.to_string(),
        }))
        .await;

    // The job runs in its own task so a panic still ends in a terminal event.
    let job = tokio::spawn({
        let task_id = task_id.clone();
        let request = request.clone();
        let registry = Arc::clone(&registry);
        async move {
            tokio::time::timeout(
                timeout,
                execute(&task_id, &request, gateway.as_ref(), &registry),
            )
            .await
            .unwrap_or_else(|_| Err(Error::Timeout(timeout)))
        }
    });
    let outcome = job.await.unwrap_or_else(|e| {
        error!(%task_id, error = %e, "Job task aborted");
        let cause = if e.is_panic() {
            "job panicked"
        } else {
            "job was cancelled"
        };
        Err(Error::Aborted(cause.to_string()))
    });

    discard_image(&task_id, &request).await;

    let event = match outcome {
        Ok(record) => {
            info!(%task_id, video_url = %record.video_url, "Video generated");
            TaskEvent::Complete(record)
        }
        Err(e) => {
            let record = FailureRecord::from_error(&task_id, &e);
            warn!(
                %task_id,
                kind = ?record.kind,
                status = ?record.provider_status_code,
                error = %e,
                "Video generation failed"
            );
            TaskEvent::Error(record)
        }
    };
    registry.publish(event).await;
}

async fn execute(
    task_id: &TaskId,
    request: &JobRequest,
    gateway: &dyn Gateway,
    registry: &TaskRegistry,
) -> veogen_core::Result<CompletionRecord> {
    let image_url = match &request.image {
        Some(image) => {
            let upload = ImageUpload {
                bytes: tokio::fs::read(image.path()).await?,
                media_type: image.media_type().to_string(),
                file_name: image.upload_name(),
            };
            Some(gateway.stage_image(&upload).await?)
        }
        None => None,
    };

    let input = GatewayInput {
        prompt: request.prompt.clone(),
        duration: request.duration.api_duration().to_string(),
        aspect_ratio: request.aspect_ratio.as_str().to_string(),
        image_url,
    };

    let (progress_tx, mut progress_rx) = mpsc::channel::<Value>(PROGRESS_CHANNEL_CAPACITY);
    let forward = async {
        while let Some(payload) = progress_rx.recv().await {
            let event = ProgressEvent {
                task_id: task_id.clone(),
                percent: normalize_percent(&payload),
                message: progress_message(&payload),
            };
            debug!(%task_id, percent = event.percent, "Progress");
            registry.publish(TaskEvent::Progress(event)).await;
        }
    };

    let (result, ()) = tokio::join!(gateway.subscribe(input, progress_tx), forward);
    let raw = result?;
    normalize_response(task_id, &raw)
}
