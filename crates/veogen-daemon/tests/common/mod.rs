//! Shared test helpers: a scripted gateway and relay wiring.

#![allow(dead_code, clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use veogen_daemon::gateway::{Gateway, GatewayError, GatewayInput, ImageUpload};
use veogen_daemon::registry::{RegistryConfig, TaskRegistry};
use veogen_daemon::relay::{RelayConfig, TaskRelay};

/// How a scripted job ends.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Resolve with this raw result object.
    Result(Value),
    /// Reject with a provider API error.
    Reject { status: u16, detail: Option<Value> },
    /// Resolve with a `data`-wrapped URL derived from the prompt.
    EchoPrompt,
    /// Never resolve.
    Hang,
    /// Panic inside the gateway call.
    Panic,
}

/// Gateway stub that replays scripted progress payloads, then the outcome.
pub struct StubGateway {
    progress: Vec<Value>,
    outcome: Outcome,
    step_delay: Duration,
    calls: AtomicUsize,
    staged: Mutex<Vec<ImageUpload>>,
    inputs: Mutex<Vec<GatewayInput>>,
}

impl StubGateway {
    pub fn new(progress: Vec<Value>, outcome: Outcome) -> Self {
        Self {
            progress,
            outcome,
            step_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            staged: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Pause between scripted steps.
    pub const fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Number of `subscribe` calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn staged(&self) -> Vec<ImageUpload> {
        self.staged.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<GatewayInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn stage_image(&self, image: &ImageUpload) -> Result<String, GatewayError> {
        self.staged.lock().unwrap().push(image.clone());
        Ok(format!("https://stub.storage/{}", image.file_name))
    }

    async fn subscribe(
        &self,
        input: GatewayInput,
        progress: mpsc::Sender<Value>,
    ) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.clone());

        for payload in &self.progress {
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
            let _ = progress.send(payload.clone()).await;
        }
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }

        match &self.outcome {
            Outcome::Result(value) => Ok(value.clone()),
            Outcome::EchoPrompt => Ok(serde_json::json!({
                "data": { "url": format!("https://x/{}.mp4", input.prompt) }
            })),
            Outcome::Reject { status, detail } => Err(GatewayError::Api {
                status: *status,
                message: "Forbidden".into(),
                detail: detail.clone(),
            }),
            Outcome::Hang => std::future::pending().await,
            Outcome::Panic => panic!("scripted gateway fault"),
        }
    }
}

/// Relay over `gateway` with default registry settings.
pub fn relay_with(gateway: Arc<StubGateway>) -> TaskRelay {
    relay_with_config(gateway, RelayConfig::default(), RegistryConfig::default())
}

pub fn relay_with_config(
    gateway: Arc<StubGateway>,
    relay_config: RelayConfig,
    registry_config: RegistryConfig,
) -> TaskRelay {
    TaskRelay::new(
        gateway,
        Arc::new(TaskRegistry::new(registry_config)),
        relay_config,
    )
}
