//! Temporary storage for uploaded images.
//!
//! Uploads are written under the configured temp directory with randomized
//! names and handed to a task as [`ImageRef::Staged`]. The relay removes them
//! when the task terminates.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use veogen_core::{ImageRef, TaskId};

/// Errors from staging an upload.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Only image files are allowed (got {0})")]
    NotAnImage(String),

    #[error("Image too large: {size} bytes exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Failed to stage image: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploaded images to a private temp directory.
#[derive(Debug, Clone)]
pub struct ImageStager {
    dir: PathBuf,
    max_bytes: usize,
}

impl ImageStager {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Reject uploads that cannot be staged, before reading the whole body.
    pub fn check(&self, media_type: &str, size: usize) -> Result<(), StagingError> {
        if !media_type.starts_with("image/") {
            return Err(StagingError::NotAnImage(media_type.to_string()));
        }
        if size > self.max_bytes {
            return Err(StagingError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Write `bytes` to a fresh file and return a task-owned image reference.
    pub async fn stage(
        &self,
        bytes: &[u8],
        media_type: &str,
        original_name: Option<&str>,
    ) -> Result<ImageRef, StagingError> {
        self.check(media_type, bytes.len())?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let ext = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|e| e.to_str())
            .map_or_else(|| extension_for(media_type).to_string(), str::to_ascii_lowercase);
        let path = self
            .dir
            .join(format!("upload-{}.{ext}", Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes).await?;

        info!(
            path = %path.display(),
            media_type,
            size_bytes = bytes.len(),
            "Staged uploaded image"
        );
        Ok(ImageRef::Staged {
            path,
            media_type: media_type.to_string(),
        })
    }
}

/// File extension for an image media type.
fn extension_for(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// Remove a task-owned image. Caller-owned files are left alone.
///
/// Returns `true` if a file was removed.
pub async fn release(task_id: &TaskId, image: &ImageRef) -> bool {
    if !image.is_task_owned() {
        return false;
    }
    let path = image.path();
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(%task_id, path = %path.display(), "Removed staged image");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(%task_id, path = %path.display(), error = %e, "Failed to remove staged image");
            false
        }
    }
}
