use std::path::{Path, PathBuf};

use uuid::Uuid;

use minichat_shared::errors::{AppError, AppResult, ErrorCode};

/// Length of a hyphenated uuid plus the `_` separator.
const PREFIX_LEN: usize = 37;

/// Attachment blobs stored flat under one directory as `<uuid>_<name>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

/// Last path component of a client-supplied name, without control characters.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    match cleaned.trim() {
        "" | "." | ".." => "file".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Name the file was uploaded under.
pub fn original_name(stored: &str) -> &str {
    match (stored.get(..PREFIX_LEN - 1), stored.get(PREFIX_LEN - 1..PREFIX_LEN)) {
        (Some(prefix), Some("_")) if Uuid::parse_str(prefix).is_ok() => &stored[PREFIX_LEN..],
        _ => stored,
    }
}

impl FileStore {
    /// Creates the root directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!(root = %root.display(), "file store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, stored: &str) -> AppResult<PathBuf> {
        if stored.is_empty() || stored.contains(['/', '\\']) || stored.starts_with('.') {
            return Err(AppError::new(ErrorCode::FileNotFound, "file not found"));
        }
        Ok(self.root.join(stored))
    }

    /// Writes the blob and returns its stored name.
    pub async fn save(&self, original: &str, bytes: &[u8]) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::new(ErrorCode::ValidationError, "uploaded file is empty"));
        }
        let stored = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(original));
        let path = self.path_of(&stored)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("writing {}: {e}", path.display())))?;

        tracing::debug!(stored = %stored, size = bytes.len(), "file stored");
        Ok(stored)
    }

    pub async fn read(&self, stored: &str) -> AppResult<Vec<u8>> {
        let path = self.path_of(stored)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::new(ErrorCode::FileNotFound, "file not found"))
            }
            Err(e) => Err(AppError::Internal(anyhow::anyhow!("reading {}: {e}", path.display()))),
        }
    }

    /// Best-effort removal of a blob whose message is gone or was never persisted.
    pub async fn remove(&self, stored: &str) {
        let Ok(path) = self.path_of(stored) else {
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(stored = %stored, "file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(stored = %stored, error = %e, "failed to remove file"),
        }
    }
}
