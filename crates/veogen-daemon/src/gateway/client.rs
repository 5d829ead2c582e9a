//! fal.ai queue REST client.
//!
//! Submits a job to the model queue, polls its status until completion while
//! forwarding log payloads as progress, then fetches the result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use veogen_core::config::{GatewayConfig, ImageStaging};

use super::types::{GatewayInput, ImageUpload, QueueState, QueueStatus, QueueSubmitted, UploadTicket};
use super::{Gateway, GatewayError, inline_data_uri};

/// fal.ai queue API client.
#[derive(Debug)]
pub struct FalClient {
    http: reqwest::Client,
    queue_url: String,
    storage_url: String,
    model: String,
    poll_interval: Duration,
    image_staging: ImageStaging,
}

impl FalClient {
    /// Create a new client.
    pub fn new(config: &GatewayConfig, api_key: &str) -> Result<Self, GatewayError> {
        if config.queue_url.is_empty() {
            return Err(GatewayError::Config("queue_url is empty".into()));
        }
        if config.model.is_empty() {
            return Err(GatewayError::Config("model is empty".into()));
        }
        if api_key.is_empty() {
            return Err(GatewayError::Config("API key is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let key_val = HeaderValue::from_str(&format!("Key {api_key}"))
            .map_err(|_| GatewayError::Config("Invalid API key format".into()))?;
        headers.insert(AUTHORIZATION, key_val);

        // reqwest is built with rustls-no-provider; an `Err` here only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            queue_url: config.queue_url.trim_end_matches('/').to_string(),
            storage_url: config.storage_url.trim_end_matches('/').to_string(),
            model: config.model.trim_matches('/').to_string(),
            poll_interval: config.poll_interval(),
            image_staging: config.image_staging,
        })
    }

    /// Queue submission URL for the configured model.
    pub(crate) fn submit_url(&self) -> String {
        format!("{}/{}", self.queue_url, self.model)
    }

    /// Status URL for a request when the queue response omits it.
    pub(crate) fn status_url(&self, request_id: &str) -> String {
        format!("{}/requests/{request_id}/status", self.submit_url())
    }

    /// Result URL for a request when the queue response omits it.
    pub(crate) fn response_url(&self, request_id: &str) -> String {
        format!("{}/requests/{request_id}", self.submit_url())
    }

    pub(crate) fn upload_initiate_url(&self) -> String {
        format!(
            "{}/storage/upload/initiate?storage_type=fal-cdn-v3",
            self.storage_url
        )
    }

    /// Turn a non-success response into an API error carrying the body's
    /// `detail` field when there is one.
    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }

    async fn enqueue(&self, input: &GatewayInput) -> Result<QueueSubmitted, GatewayError> {
        let resp = self.http.post(self.submit_url()).json(input).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn poll_status(&self, url: &str) -> Result<QueueStatus, GatewayError> {
        let resp = self.http.get(with_logs(url)).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn fetch_result(&self, url: &str) -> Result<Value, GatewayError> {
        let resp = self.http.get(url).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Upload image bytes to provider storage, returning the public file URL.
    async fn upload(&self, image: &ImageUpload) -> Result<String, GatewayError> {
        let resp = self
            .http
            .post(self.upload_initiate_url())
            .json(&serde_json::json!({
                "content_type": image.media_type,
                "file_name": image.file_name,
            }))
            .send()
            .await?;
        let ticket: UploadTicket = Self::check_status(resp).await?.json().await?;

        let resp = self
            .http
            .put(&ticket.upload_url)
            .header(CONTENT_TYPE, &image.media_type)
            .body(image.bytes.clone())
            .send()
            .await?;
        Self::check_status(resp).await?;

        info!(file_url = %ticket.file_url, bytes = image.bytes.len(), "Image uploaded");
        Ok(ticket.file_url)
    }
}

#[async_trait]
impl Gateway for FalClient {
    async fn stage_image(&self, image: &ImageUpload) -> Result<String, GatewayError> {
        match self.image_staging {
            ImageStaging::Upload => self.upload(image).await,
            ImageStaging::Inline => Ok(inline_data_uri(image)),
        }
    }

    async fn subscribe(
        &self,
        input: GatewayInput,
        progress: mpsc::Sender<Value>,
    ) -> Result<Value, GatewayError> {
        let submitted = self.enqueue(&input).await?;
        let request_id = submitted.request_id;
        info!(request_id, model = %self.model, "Job queued");

        let status_url = submitted
            .status_url
            .unwrap_or_else(|| self.status_url(&request_id));
        let response_url = submitted
            .response_url
            .unwrap_or_else(|| self.response_url(&request_id));

        loop {
            let status = self.poll_status(&status_url).await?;
            match status.status {
                QueueState::InQueue => {
                    debug!(request_id, position = ?status.queue_position, "Waiting in queue");
                }
                QueueState::InProgress => {
                    let payload = status.logs.unwrap_or(Value::Null);
                    if progress.send(payload).await.is_err() {
                        debug!(request_id, "Progress receiver dropped");
                    }
                }
                QueueState::Completed => break,
                QueueState::Unknown => {
                    warn!(request_id, "Unknown queue status");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        debug!(request_id, "Fetching result");
        self.fetch_result(&response_url).await
    }
}

/// Ask the status endpoint to include log entries.
pub(crate) fn with_logs(url: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}logs=1")
}

/// Build an API error from a status and raw response body.
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    GatewayError::Api {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("Unknown").into(),
        detail,
    }
}
