use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub const DEFAULT_DOWNLOAD_NAME: &str = "download.bin";

/// Destination for downloaded binary content.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> std::io::Result<PathBuf>;
}

/// Saves downloads into a directory, staging each one in a `.part` file first.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for FileSink {
    async fn save(&self, filename: &str, bytes: Vec<u8>) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = safe_filename(filename);
        let target = self.dir.join(&name);
        let staging = self.dir.join(format!("{}.part", name));

        let written = tokio::fs::write(&staging, &bytes).await;
        drop(bytes);

        if let Err(e) = written {
            discard_staging(&staging).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            discard_staging(&staging).await;
            return Err(e);
        }

        Ok(target)
    }
}

/// Removes a partially written or unrenamed staging file. Missing files are fine.
async fn discard_staging(staging: &Path) {
    if let Err(e) = tokio::fs::remove_file(staging).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", staging.display(), e);
        }
    }
}

/// Final path component of `filename`, or the default name when nothing usable remains.
pub fn safe_filename(filename: &str) -> String {
    Path::new(filename.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}

/// Filename suggested by a download target: its last path segment, if it has an extension.
pub fn filename_from_target(target: &str) -> String {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(segment) if segment.contains('.') => safe_filename(segment),
        _ => DEFAULT_DOWNLOAD_NAME.to_string(),
    }
}
