//! Configuration resolution for veogen.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/veogen/settings.json)
//! 3. Project config (.veogen/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binaries)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Complete veogen configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: Credentials,
}

/// How image attachments are handed to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStaging {
    /// Upload to provider storage and pass the returned URL.
    #[default]
    Upload,
    /// Embed as a base64 `data:` URI in the job input.
    Inline,
}

/// Remote gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Queue API base URL.
    pub queue_url: String,
    /// Storage API base URL used for image uploads.
    pub storage_url: String,
    /// Model endpoint id.
    pub model: String,
    pub poll_interval_ms: u64,
    /// Deadline for a whole job, from submission to result.
    pub timeout_secs: u64,
    pub image_staging: ImageStaging,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            queue_url: "https://queue.fal.run".to_string(),
            storage_url: "https://rest.alpha.fal.ai".to_string(),
            model: "fal-ai/veo3".to_string(),
            poll_interval_ms: 1000,
            timeout_secs: 600,
            image_staging: ImageStaging::Upload,
        }
    }
}

impl GatewayConfig {
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP server and relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory for staged image uploads.
    pub temp_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// How long a finished task's terminal event stays available to late subscribers.
    pub terminal_retention_secs: u64,
    pub max_subscribers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("veogen"),
            max_upload_bytes: 10 * 1024 * 1024, // 10 MB
            terminal_retention_secs: 60,
            max_subscribers: 16,
        }
    }
}

impl ServerConfig {
    pub const fn terminal_retention(&self) -> Duration {
        Duration::from_secs(self.terminal_retention_secs)
    }
}

/// Provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Credentials {
    pub api_key: Option<String>,
}

impl Credentials {
    /// The API key, or a configuration error when none is set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("FAL_KEY (or FAL_API_KEY) is not set".into()))
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut layers = Vec::new();
    if let Some(global_path) = global_config_path() {
        layers.push(global_path);
    }
    if let Some(dir) = project_dir {
        layers.push(dir.join(".veogen").join("settings.json"));
    }

    let mut config = resolve_files(&layers)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("veogen").join("settings.json"))
}

/// Merge existing files over the defaults, later files winning field by field.
fn resolve_files(paths: &[PathBuf]) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths.iter().filter(|p| p.exists()) {
        merge_json(&mut merged, load_config_file(path)?);
        debug!(path = %path.display(), "Loaded config file");
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_json(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(key) = var("FAL_KEY").or_else(|| var("FAL_API_KEY")) {
        config.credentials.api_key = Some(key);
    }
    if let Some(url) = var("VEOGEN_GATEWAY_URL") {
        config.gateway.queue_url = url;
    }
    if let Some(n) = var("VEOGEN_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.gateway.timeout_secs = n;
    }
    if let Some(dir) = var("VEOGEN_TEMP_DIR") {
        config.server.temp_dir = PathBuf::from(dir);
    }
}
