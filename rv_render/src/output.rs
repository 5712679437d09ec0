use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::RenderId;

#[derive(Error, Debug)]
pub enum OutputDirError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Output path {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

/// Persistent directory that rendered videos are written to and served from.
#[derive(Debug, Clone)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    /// Make sure the output directory exists, creating it if needed.
    ///
    /// # Errors
    /// If the directory cannot be created or the path is taken by a file.
    pub async fn prepare(path: impl Into<PathBuf>) -> Result<Self, OutputDirError> {
        let path = path.into();

        tokio::fs::create_dir_all(&path).await.map_err(|source| {
            if path.is_file() {
                OutputDirError::NotADirectory(path.clone())
            } else {
                OutputDirError::Create {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        tracing::info!("videos will be written to {}", path.display());

        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn video_path(&self, id: RenderId) -> PathBuf {
        self.path.join(id.video_file_name())
    }
}
