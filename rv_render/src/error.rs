use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Workspace I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to spawn render engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to communicate with render engine: {0}")]
    EngineIo(#[source] std::io::Error),
    #[error("Render engine {0} was not captured")]
    MissingPipe(&'static str),
    #[error("Render failed with {status}")]
    EngineFailed { status: String, output: String },
    #[error("Render pipeline failed: {message}")]
    PipelineFailed { message: String, output: String },
    #[error("Render timed out after {0:?}")]
    Timeout(Duration),
    #[error("Render engine reported success but {} was not written", .0.display())]
    MissingOutput(PathBuf),
    #[error("Invalid render engine command: {0:?}")]
    InvalidCommand(String),
}

impl RenderError {
    /// Engine output captured before the failure, if there was any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::EngineFailed { output, .. }
            | Self::PipelineFailed { output, .. }
                if !output.is_empty() =>
            {
                Some(output)
            }
            _ => None,
        }
    }
}
