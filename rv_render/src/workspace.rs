use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{RenderError, RenderId};

pub const COMPONENT_FILE: &str = "Video.tsx";
pub const ENTRY_FILE: &str = "index.tsx";
pub const COMPOSITION_ID: &str = "MyVideo";

const FRAME_RATE: u32 = 30;
const RESOLUTION: (u32, u32) = (1920, 1080);

/// When a workspace is removed after its render finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Remove the workspace whatever the render outcome.
    #[default]
    Always,
    /// Keep the workspace of a failed render on disk for inspection.
    OnSuccess,
}

impl CleanupPolicy {
    #[must_use]
    pub const fn should_teardown(self, succeeded: bool) -> bool {
        match self {
            Self::Always => true,
            Self::OnSuccess => succeeded,
        }
    }
}

/// Per-request directory holding the generated component and entry files.
///
/// The directory is removed when the workspace is dropped, so a request that
/// is cancelled mid-render leaves nothing behind. Call [`Workspace::keep`] to
/// leave it on disk.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    remove_on_drop: bool,
}

impl Workspace {
    /// Create `root/render-<id>`, including any missing parents.
    ///
    /// # Errors
    /// If the directory cannot be created.
    pub async fn create(root: &Path, id: RenderId) -> Result<Self, RenderError> {
        let dir = root.join(id.workspace_name());
        tokio::fs::create_dir_all(&dir).await?;

        tracing::debug!("created workspace at {}", dir.display());

        Ok(Self {
            dir,
            remove_on_drop: true,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn component_path(&self) -> PathBuf {
        self.dir.join(COMPONENT_FILE)
    }

    #[must_use]
    pub fn entry_path(&self) -> PathBuf {
        self.dir.join(ENTRY_FILE)
    }

    /// Write the caller's component source verbatim, plus an entry file
    /// declaring a composition around it.
    ///
    /// # Errors
    /// If either file cannot be written.
    pub async fn stage(
        &self,
        code: &str,
        duration_in_frames: u32,
    ) -> Result<(), RenderError> {
        tokio::fs::write(self.component_path(), code).await?;
        tokio::fs::write(self.entry_path(), entry_source(duration_in_frames))
            .await?;

        Ok(())
    }

    /// Remove the workspace directory tree. Failures are logged, never
    /// returned; a directory that is already gone is not an error.
    pub async fn teardown(mut self) {
        self.remove_on_drop = false;

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                tracing::debug!("removed workspace {}", self.dir.display());
            }
            Err(e) => log_removal_error(&self.dir, &e),
        }
    }

    /// Leave the workspace on disk, returning its path.
    #[must_use]
    pub fn keep(mut self) -> PathBuf {
        self.remove_on_drop = false;
        std::mem::take(&mut self.dir)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.remove_on_drop {
            return;
        }

        tracing::warn!("removing abandoned workspace {}", self.dir.display());
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            log_removal_error(&self.dir, &e);
        }
    }
}

fn log_removal_error(dir: &Path, e: &std::io::Error) {
    if e.kind() != std::io::ErrorKind::NotFound {
        tracing::warn!("failed to remove workspace {}: {}", dir.display(), e);
    }
}

/// Source of the entry file registering the root composition.
#[must_use]
pub fn entry_source(duration_in_frames: u32) -> String {
    format!(
        r#"import {{ Composition, registerRoot }} from 'remotion';
import {{ MyVideo }} from './Video';

export const RemotionRoot = () => {{
  return (
    <Composition
      id="{COMPOSITION_ID}"
      component={{MyVideo}}
      durationInFrames={{{duration_in_frames}}}
      fps={{{FRAME_RATE}}}
      width={{{width}}}
      height={{{height}}}
    />
  );
}};

registerRoot(RemotionRoot);
"#,
        width = RESOLUTION.0,
        height = RESOLUTION.1,
    )
}
