//! Staging and rendering of video compositions.
//!
//! A render request owns a [`Workspace`] holding the generated component and
//! entry files. An [`Engine`] drives the external renderer over that
//! workspace and writes the result into the [`OutputDir`].

pub mod engine;
mod error;
pub mod id;
pub mod output;
pub mod pipeline;
pub mod retention;
pub mod workspace;

pub use engine::{Engine, EngineCommand, RenderJob, RenderOutcome, RenderStrategy};
pub use error::RenderError;
pub use id::{RenderId, RenderIdGenerator};
pub use output::{OutputDir, OutputDirError};
pub use workspace::{CleanupPolicy, Workspace};
