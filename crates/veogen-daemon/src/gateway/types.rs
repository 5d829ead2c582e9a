//! fal queue and storage API types.
//!
//! Deserialization structs matching the fal REST JSON responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job input posted to the model endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayInput {
    pub prompt: String,
    /// Provider duration string, e.g. `"8s"`.
    pub duration: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Image bytes to be made addressable by the provider.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub file_name: String,
}

/// Response to a queue submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSubmitted {
    pub request_id: String,
    #[serde(default)]
    pub status_url: Option<String>,
    #[serde(default)]
    pub response_url: Option<String>,
}

/// Queue state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    InQueue,
    InProgress,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Response from the request status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub status: QueueState,
    #[serde(default)]
    pub queue_position: Option<u64>,
    /// Provider log entries; shape varies between model versions.
    #[serde(default)]
    pub logs: Option<Value>,
}

/// Response from the storage upload initiation endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTicket {
    pub upload_url: String,
    pub file_url: String,
}
