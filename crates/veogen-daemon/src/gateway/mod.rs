//! Remote inference gateway.
//!
//! [`Gateway`] is the boundary to the video provider: it stages images and
//! runs a job to completion, forwarding raw progress payloads on a channel.
//! [`FalClient`] implements it against the fal.ai queue REST API.

mod client;
pub mod types;


use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

pub use client::FalClient;
pub use types::{GatewayInput, ImageUpload};

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        detail: Option<Value>,
    },

    #[error("Unexpected provider response: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<GatewayError> for veogen_core::Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Api {
                status,
                message,
                detail,
            } => Self::Gateway {
                message,
                status: Some(status),
                detail,
            },
            GatewayError::Http(e) => Self::Gateway {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
                detail: None,
            },
            GatewayError::Protocol(message) => Self::Gateway {
                message,
                status: None,
                detail: None,
            },
            GatewayError::Config(message) => Self::Config(message),
        }
    }
}

/// Remote video generation service.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Make an image addressable by the provider and return the URL to use as
    /// `image_url`. Defaults to an inline `data:` URI.
    async fn stage_image(&self, image: &ImageUpload) -> Result<String, GatewayError> {
        Ok(inline_data_uri(image))
    }

    /// Run a job to completion. Raw progress payloads are sent on `progress`
    /// in the order the provider reports them; the returned value is the
    /// provider's result object, whatever its shape.
    async fn subscribe(
        &self,
        input: GatewayInput,
        progress: mpsc::Sender<Value>,
    ) -> Result<Value, GatewayError>;
}

/// Encode an image as a base64 `data:` URI.
pub fn inline_data_uri(image: &ImageUpload) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    format!("data:{};base64,{encoded}", image.media_type)
}
