//! Uploaded file storage.
//!
//! Files land flat in one directory under a generated name and are served
//! back from `/uploads/<name>`.

use std::path::{Path, PathBuf};

use rand::Rng;
use thiserror::Error;

/// URL prefix uploaded files are served under.
pub const UPLOADS_PREFIX: &str = "/uploads";

/// Errors from saving an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory that receives uploaded files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Use `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// Directory the files are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `bytes` under a fresh name that keeps `original_name`'s
    /// extension. Returns the `/uploads/<name>` reference.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the file cannot be written.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let name = generate_name(original_name);
        tokio::fs::write(self.dir.join(&name), bytes).await?;
        tracing::debug!(file = %name, size = bytes.len(), "upload stored");
        Ok(format!("{UPLOADS_PREFIX}/{name}"))
    }

    /// Delete a file previously returned by [`save`](Self::save).
    ///
    /// References outside `/uploads` and missing files are ignored.
    pub async fn discard(&self, reference: &str) {
        let Some(name) = reference
            .strip_prefix(UPLOADS_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            return;
        };
        if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(error = %e, file = %name, "failed to delete upload");
        }
    }
}

/// `{unix_millis}-{0..1_000_000}{.ext}`.
fn generate_name(original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt: u32 = rand::rng().random_range(0..1_000_000);
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{millis}-{salt}{ext}")
}

/// Image content type implied by a file name's extension.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
