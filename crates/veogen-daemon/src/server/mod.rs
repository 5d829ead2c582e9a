//! HTTP server for the veogen daemon.
//!
//! Exposes job submission, per-task server-sent event streams and a health
//! endpoint.

mod error;
pub mod routes;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tracing::info;

use veogen_core::Config;

use crate::gateway::Gateway;
use crate::registry::{RegistryConfig, TaskRegistry};
use crate::relay::{RelayConfig, TaskRelay};
use crate::staging::ImageStager;

/// Room for the non-file form fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<TaskRelay>,
    pub stager: ImageStager,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.stager.max_bytes().saturating_add(FORM_OVERHEAD_BYTES);
    Router::new()
        .route("/api/generate", post(routes::generate))
        .route("/api/tasks/{task_id}/events", get(routes::task_events))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

impl AppState {
    /// Wire a gateway into a relay, registry and stager configured from
    /// `config`.
    pub fn from_config(config: &Config, gateway: Arc<dyn Gateway>) -> Self {
        let registry = Arc::new(TaskRegistry::new(RegistryConfig {
            max_subscribers: config.server.max_subscribers,
            terminal_retention: config.server.terminal_retention(),
            ..RegistryConfig::default()
        }));
        let relay = TaskRelay::new(gateway, registry, RelayConfig::from(&config.gateway));
        Self {
            relay: Arc::new(relay),
            stager: ImageStager::new(&config.server.temp_dir, config.server.max_upload_bytes),
        }
    }
}
