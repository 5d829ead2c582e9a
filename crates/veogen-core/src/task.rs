//! Job request model and task identifiers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Opaque identifier correlating a submission with all of its events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocate a fresh id: `task-<unix millis>-<9 random alphanumerics>`.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("task-{millis}-{}", &random[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Requested clip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationHint {
    #[default]
    Short,
    Medium,
    Long,
}

impl DurationHint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Duration string sent to the provider. Veo3 only renders 8 second clips,
    /// so every hint maps to the same value.
    pub const fn api_duration(self) -> &'static str {
        "8s"
    }
}

impl FromStr for DurationHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(Error::Validation(format!(
                "Unknown duration '{other}' (expected short, medium or long)"
            ))),
        }
    }
}

impl fmt::Display for DurationHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output frame shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::Square => "1:1",
        }
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            "1:1" => Ok(Self::Square),
            other => Err(Error::Validation(format!(
                "Unknown aspect ratio '{other}' (expected 16:9, 9:16 or 1:1)"
            ))),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image input attached to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// A file owned by the caller. Read, never removed.
    File(PathBuf),
    /// An upload staged for this task. Removed once the task terminates.
    Staged { path: PathBuf, media_type: String },
}

impl ImageRef {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Staged { path, .. } => path,
        }
    }

    /// Declared media type; caller-owned files are typed by extension.
    pub fn media_type(&self) -> &str {
        match self {
            Self::File(path) => media_type_for_path(path),
            Self::Staged { media_type, .. } => media_type,
        }
    }

    pub const fn is_task_owned(&self) -> bool {
        matches!(self, Self::Staged { .. })
    }

    /// Name presented to the gateway when uploading, e.g. `image.png`.
    pub fn upload_name(&self) -> String {
        let ext = self
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        format!("image.{ext}")
    }
}

/// Guess an image media type from a file extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// A single video generation request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub prompt: String,
    pub duration: DurationHint,
    pub aspect_ratio: AspectRatio,
    pub image: Option<ImageRef>,
}

impl JobRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration: DurationHint::default(),
            aspect_ratio: AspectRatio::default(),
            image: None,
        }
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: DurationHint) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub const fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Checks that can be made without touching the filesystem or network.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::Validation("Prompt is required".into()));
        }
        if let Some(image) = &self.image
            && !image.media_type().starts_with("image/")
        {
            return Err(Error::Validation(format!(
                "Only image files are allowed (got {})",
                image.media_type()
            )));
        }
        Ok(())
    }
}
