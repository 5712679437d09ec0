use std::path::Path;
use std::sync::Arc;

use rv_render::{CleanupPolicy, Engine, OutputDir, RenderId, RenderIdGenerator};
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

use crate::config::Config;
use crate::error::StartupError;

/// Shared resources of the render server, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: Arc<Config>,
    output: OutputDir,
    engine: Engine,
    ids: Arc<RenderIdGenerator>,
    render_slots: Option<Arc<Semaphore>>,
}

impl rv_app::ContextProvider<Config> for AppContext {
    type Error = StartupError;

    async fn new(config: Config) -> Result<Self, StartupError> {
        let output = OutputDir::prepare(&config.output_dir).await?;
        let engine = config.engine()?;

        let render_slots = match config.max_concurrent_renders {
            0 => None,
            limit => {
                tracing::info!("allowing at most {} concurrent renders", limit);
                Some(Arc::new(Semaphore::new(limit)))
            }
        };

        Ok(Self {
            config: Arc::new(config),
            output,
            engine,
            ids: Arc::new(RenderIdGenerator::new()),
            render_slots,
        })
    }
}

impl AppContext {
    /// Replace the engine built from the configuration.
    #[must_use]
    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn output(&self) -> &OutputDir {
        &self.output
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.config.temp_dir
    }

    #[must_use]
    pub fn cleanup_policy(&self) -> CleanupPolicy {
        self.config.workspace_cleanup
    }

    pub fn next_render_id(&self) -> RenderId {
        self.ids.next_id()
    }

    /// Wait for a free render slot. Without a concurrency limit this returns
    /// immediately with no permit.
    ///
    /// # Errors
    /// If the semaphore has been closed.
    pub async fn acquire_render_slot(
        &self,
    ) -> Result<Option<OwnedSemaphorePermit>, AcquireError> {
        match &self.render_slots {
            Some(slots) => Arc::clone(slots).acquire_owned().await.map(Some),
            None => Ok(None),
        }
    }
}
