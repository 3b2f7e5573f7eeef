//! Cover image persistence.
//!
//! The HTTP layer streams file parts to a temporary directory and hands
//! them to services as [`UploadedFiles`]. [`UploadStore`] moves a temp file
//! into the public uploads directory and returns the path clients use to
//! fetch it.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use uuid::Uuid;

use crate::errors::BlogResult;

/// A file part already written to disk by the multipart middleware.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub temp_path: PathBuf,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: u64,
}

/// All file parts of one request, keyed by form field name.
#[derive(Debug, Clone, Default)]
pub struct UploadedFiles(pub Vec<UploadedFile>);

impl UploadedFiles {
    pub fn take(&mut self, field: &str) -> Option<UploadedFile> {
        let idx = self.0.iter().position(|f| f.field == field)?;
        Some(self.0.remove(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove whatever temp files were not claimed.
    pub async fn cleanup(self) {
        for file in self.0 {
            if let Err(e) = tokio::fs::remove_file(&file.temp_path).await {
                tracing::debug!(path = %file.temp_path.display(), error = %e, "temp upload already gone");
            }
        }
    }
}

/// A file stored under the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub path: PathBuf,
    /// `/uploads/<name>`
    pub public_path: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_prefix: String,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_prefix: "/uploads".to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> BlogResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create uploads dir {}", self.root.display()))
    }

    /// Move `file` into the uploads directory under a generated name.
    pub async fn persist(&self, file: &UploadedFile) -> BlogResult<StoredUpload> {
        self.ensure_root().await?;

        let name = generated_name(file.filename.as_deref());
        let path = self.root.join(&name);

        if tokio::fs::rename(&file.temp_path, &path).await.is_err() {
            // Temp dir may live on another filesystem.
            tokio::fs::copy(&file.temp_path, &path)
                .await
                .with_context(|| format!("failed to store upload {}", path.display()))?;
            let _ = tokio::fs::remove_file(&file.temp_path).await;
        }

        tracing::info!(file = %name, size = file.size, "stored upload");

        Ok(StoredUpload {
            path,
            public_path: format!("{}/{}", self.public_prefix, name),
        })
    }

    pub async fn discard(&self, stored: &StoredUpload) {
        match tokio::fs::remove_file(&stored.path).await {
            Ok(()) => tracing::info!(path = %stored.path.display(), "discarded upload"),
            Err(e) => tracing::warn!(path = %stored.path.display(), error = %e, "failed to discard upload"),
        }
    }
}

fn generated_name(client_filename: Option<&str>) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let random = &Uuid::new_v4().simple().to_string()[..9];

    match client_filename.and_then(extension) {
        Some(ext) => format!("{millis}-{random}.{ext}"),
        None => format!("{millis}-{random}"),
    }
}

fn extension(filename: &str) -> Option<String> {
    // Only the final path component counts; dots in directory names do not.
    let ext = Path::new(filename).extension()?.to_str()?;
    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
