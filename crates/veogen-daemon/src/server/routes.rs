//! HTTP handlers.

use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::Serialize;
use tokio_stream::Stream;
use tracing::{debug, warn};

use veogen_core::{AspectRatio, DurationHint, JobRequest, TaskId};

use super::AppState;
use super::error::ApiError;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Response body of `POST /api/generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub task_id: TaskId,
    pub message: &'static str,
}

/// Response body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub active_tasks: usize,
    pub finished_tasks: usize,
    pub subscribers: usize,
}

/// Image part of a generate form, held in memory until the form is parsed.
struct ImagePart {
    bytes: Vec<u8>,
    media_type: String,
    file_name: Option<String>,
}

/// `POST /api/generate`: start a job from a multipart form.
///
/// Fields: `prompt` (required), `duration`, `aspectRatio`, `image` (file).
pub async fn generate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut prompt = String::new();
    let mut duration = DurationHint::default();
    let mut aspect_ratio = AspectRatio::default();
    let mut image: Option<ImagePart> = None;

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => prompt = field.text().await?,
            "duration" => duration = parse_choice(&field.text().await?)?,
            "aspectRatio" => aspect_ratio = parse_choice(&field.text().await?)?,
            "image" => {
                let file_name = field.file_name().map(str::to_string);
                let media_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await? {
                    bytes.extend_from_slice(&chunk);
                    state.stager.check(&media_type, bytes.len())?;
                }
                // Browsers send an empty part when no file was chosen.
                if bytes.is_empty() && file_name.as_deref().is_none_or(str::is_empty) {
                    continue;
                }
                state.stager.check(&media_type, bytes.len())?;
                image = Some(ImagePart {
                    bytes,
                    media_type,
                    file_name,
                });
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let mut request = JobRequest::new(prompt)
        .with_duration(duration)
        .with_aspect_ratio(aspect_ratio);
    if let Some(part) = image {
        let staged = state
            .stager
            .stage(&part.bytes, &part.media_type, part.file_name.as_deref())
            .await?;
        request = request.with_image(staged);
    }

    let task_id = state.relay.submit(request).await?;
    Ok(Json(GenerateResponse {
        task_id,
        message: "Video generation started",
    }))
}

/// Parse an optional choice field; blank means the default.
fn parse_choice<T>(text: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = veogen_core::Error> + Default,
{
    let text = text.trim();
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse().map_err(|e| match e {
        veogen_core::Error::Validation(message) => ApiError::BadRequest(message),
        other => ApiError::BadRequest(other.to_string()),
    })
}

/// `GET /api/tasks/{task_id}/events`: the task's events as server-sent
/// events, ending after the terminal event.
pub async fn task_events(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let task_id = TaskId::from(task_id);
    let mut subscription = state.relay.registry().subscribe(&task_id).await?;
    debug!(%task_id, "SSE subscriber connected");

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match SseEvent::default().event(event.name()).json_data(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => warn!(task_id = %event.task_id(), error = %e, "Failed to encode event"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.relay.registry().stats().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_tasks: stats.active_tasks,
        finished_tasks: stats.finished_tasks,
        subscribers: stats.subscribers,
    })
}
