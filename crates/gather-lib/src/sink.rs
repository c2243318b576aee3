//! Bundle writer
//!
//! All paths handed to the sink are relative to the bundle root. Writes go
//! to a hidden sibling file first and are renamed into place, so a failed
//! write never leaves a truncated file behind.

use crate::error::SinkError;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes query output into the must-gather bundle
#[derive(Debug, Clone)]
pub struct OutputSink {
    root: PathBuf,
}

impl OutputSink {
    /// Create a sink rooted at an (absolute) bundle directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of a bundle-relative path
    pub fn resolve(&self, relative: &Path) -> Result<PathBuf, SinkError> {
        let mut normal = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => normal = true,
                Component::CurDir => {}
                _ => return Err(SinkError::InvalidPath(relative.to_path_buf())),
            }
        }
        if !normal {
            return Err(SinkError::InvalidPath(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }

    /// Create a directory (and parents) inside the bundle
    pub async fn create_dir(&self, relative: &Path) -> Result<PathBuf, SinkError> {
        let path = self.resolve(relative)?;
        fs::create_dir_all(&path).await.map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write `content` to `relative`, replacing any existing file
    pub async fn write(&self, relative: &Path, content: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.resolve(relative)?;
        let parent = self.ensure_parent(&path).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = parent.join(format!(".{}.partial", file_name));

        let io_err = |source| SinkError::Io {
            path: path.clone(),
            source,
        };

        if let Err(e) = fs::write(&staging, content).await {
            let _ = fs::remove_file(&staging).await;
            return Err(io_err(e));
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(io_err(e));
        }

        debug!(path = %path.display(), bytes = content.len(), "Wrote bundle file");
        Ok(path)
    }

    /// Append `content` to `relative`, creating it if needed
    pub async fn append(&self, relative: &Path, content: &[u8]) -> Result<PathBuf, SinkError> {
        let path = self.resolve(relative)?;
        self.ensure_parent(&path).await?;

        let io_err = |source| SinkError::Io {
            path: path.clone(),
            source,
        };

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_err)?;
        file.write_all(content).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        Ok(path)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<PathBuf, SinkError> {
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .map_err(|source| SinkError::Io {
                path: parent.clone(),
                source,
            })?;
        Ok(parent)
    }
}
