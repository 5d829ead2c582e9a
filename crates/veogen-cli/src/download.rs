//! Saving the generated video to disk.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Download errors.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed with status {0}")]
    Status(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream `url` into `dest`. A partially written file is removed on failure.
///
/// Returns the number of bytes written.
pub async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::Status(status.as_u16()));
    }

    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    match write_body(resp, dest).await {
        Ok(bytes) => {
            info!(path = %dest.display(), bytes, "Video saved");
            Ok(bytes)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(dest).await
                && rm.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %dest.display(), error = %rm, "Failed to remove partial download");
            }
            Err(e)
        }
    }
}

async fn write_body(mut resp: reqwest::Response, dest: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = resp.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Client for downloads, sharing the process-wide rustls provider.
pub fn client() -> Result<reqwest::Client, DownloadError> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    Ok(reqwest::Client::builder().build()?)
}
