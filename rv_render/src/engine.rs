use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::pipeline::{CompositionInfo, DRIVER_SCRIPT, PipelineMonitor};
use crate::workspace::{COMPOSITION_ID, Workspace};
use crate::RenderError;

pub const DEFAULT_CODEC: &str = "h264";

/// How the external rendering engine is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStrategy {
    /// One `render` invocation of the engine's command-line interface.
    #[default]
    Cli,
    /// A driver running bundle, composition selection and rendering in the
    /// engine's runtime, reporting progress as JSON lines.
    Pipeline,
}

impl RenderStrategy {
    #[must_use]
    pub fn default_command(self) -> EngineCommand {
        match self {
            Self::Cli => EngineCommand::new("npx", ["remotion"]),
            Self::Pipeline => EngineCommand::new(
                "node",
                ["--input-type=module", "-e", DRIVER_SCRIPT],
            ),
        }
    }
}

/// Program and leading arguments used to start the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a whitespace-separated command line such as `npx remotion`.
    ///
    /// # Errors
    /// If the command line is blank.
    pub fn parse(command: &str) -> Result<Self, RenderError> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| RenderError::InvalidCommand(command.to_string()))?;

        Ok(Self::new(program, parts))
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// One render of a staged workspace into an output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub entry: PathBuf,
    pub composition_id: String,
    pub output: PathBuf,
    pub codec: String,
}

impl RenderJob {
    #[must_use]
    pub fn for_workspace(workspace: &Workspace, output: PathBuf) -> Self {
        Self {
            entry: workspace.entry_path(),
            composition_id: COMPOSITION_ID.to_string(),
            output,
            codec: DEFAULT_CODEC.to_string(),
        }
    }

    fn cli_args(&self) -> Vec<String> {
        vec![
            "render".to_string(),
            self.entry.to_string_lossy().to_string(),
            self.composition_id.clone(),
            self.output.to_string_lossy().to_string(),
            format!("--codec={}", self.codec),
        ]
    }

    fn pipeline_args(&self) -> Vec<String> {
        vec![
            self.entry.to_string_lossy().to_string(),
            self.composition_id.clone(),
            self.output.to_string_lossy().to_string(),
            self.codec.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Engine stdout that was not a structured progress event.
    pub output: String,
    /// Composition resolved by the pipeline strategy.
    pub composition: Option<CompositionInfo>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    strategy: RenderStrategy,
    command: EngineCommand,
    timeout: Option<Duration>,
}

impl Engine {
    #[must_use]
    pub const fn new(strategy: RenderStrategy, command: EngineCommand) -> Self {
        Self {
            strategy,
            command,
            timeout: None,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn strategy(&self) -> RenderStrategy {
        self.strategy
    }

    /// Run the engine until the job's output file is written.
    ///
    /// The engine's stdout and stderr are streamed into the log while it
    /// runs. Whatever the failure, no output file is left behind, including
    /// when the returned future is dropped before it completes.
    ///
    /// # Errors
    /// - `RenderError::Spawn`: the engine could not be started.
    /// - `RenderError::EngineIo`: the engine's output could not be read or
    ///   its exit status collected.
    /// - `RenderError::EngineFailed`: the engine exited unsuccessfully.
    /// - `RenderError::PipelineFailed`: the pipeline driver reported an error.
    /// - `RenderError::Timeout`: the render exceeded the configured timeout.
    /// - `RenderError::MissingOutput`: the engine succeeded without writing
    ///   the output file.
    #[tracing::instrument(skip_all, fields(strategy = ?self.strategy, output = %job.output.display()))]
    pub async fn render(
        &self,
        job: &RenderJob,
    ) -> Result<RenderOutcome, RenderError> {
        let pending = PendingOutput::new(&job.output);

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(job))
                .await
                .unwrap_or(Err(RenderError::Timeout(limit)))?,
            None => self.run(job).await?,
        };

        if !output_exists(&job.output).await {
            return Err(RenderError::MissingOutput(job.output.clone()));
        }

        pending.keep();
        Ok(outcome)
    }

    async fn run(&self, job: &RenderJob) -> Result<RenderOutcome, RenderError> {
        let mut command = self.command.to_command();
        let mut monitor = match self.strategy {
            RenderStrategy::Cli => {
                command.args(job.cli_args());
                Monitor::Cli(CliMonitor::default())
            }
            RenderStrategy::Pipeline => {
                command.args(job.pipeline_args());
                Monitor::Pipeline(PipelineMonitor::default())
            }
        };

        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a timed-out render drops the child, which must not outlive it
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::error!(
                    "failed to spawn {}: {}",
                    self.command.program,
                    source
                );
                RenderError::Spawn {
                    program: self.command.program.clone(),
                    source,
                }
            })?;

        tracing::debug!(
            "spawned render engine with PID: {}",
            child.id().map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
        );

        let stdout = child.stdout.take().ok_or(RenderError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(RenderError::MissingPipe("stderr"))?;

        let (stdout_result, stderr_result) = tokio::join!(
            for_each_line(stdout, |line| monitor.observe(line)),
            for_each_line(stderr, |line| tracing::warn!("{}", line)),
        );

        // the pipes are closed by now, so the engine cannot block on them
        let status = child.wait().await.map_err(RenderError::EngineIo)?;
        tracing::info!("render engine exited with {}", describe_status(status));

        let outcome = monitor.finish(status)?;
        stdout_result.and(stderr_result).map_err(RenderError::EngineIo)?;

        Ok(outcome)
    }
}

enum Monitor {
    Cli(CliMonitor),
    Pipeline(PipelineMonitor),
}

impl Monitor {
    fn observe(&mut self, line: &str) {
        match self {
            Self::Cli(monitor) => monitor.observe(line),
            Self::Pipeline(monitor) => monitor.observe(line),
        }
    }

    fn finish(self, status: ExitStatus) -> Result<RenderOutcome, RenderError> {
        match self {
            Self::Cli(monitor) => monitor.finish(status),
            Self::Pipeline(monitor) => monitor.finish(status),
        }
    }
}

#[derive(Debug, Default)]
struct CliMonitor {
    output: String,
}

impl CliMonitor {
    fn observe(&mut self, line: &str) {
        tracing::info!("{}", line);
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn finish(self, status: ExitStatus) -> Result<RenderOutcome, RenderError> {
        if status.success() {
            Ok(RenderOutcome {
                output: self.output,
                composition: None,
            })
        } else {
            Err(RenderError::EngineFailed {
                status: describe_status(status),
                output: self.output,
            })
        }
    }
}

/// Feed each line of `reader` to `handle`, decoding invalid UTF-8 lossily.
///
/// Reading stops at the first I/O error and the reader is dropped, closing
/// the pipe.
async fn for_each_line<R>(
    reader: R,
    mut handle: impl FnMut(&str),
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .await
            .inspect_err(|e| {
                tracing::warn!("failed to read render engine output: {}", e);
            })?;
        if read == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        handle(line.trim_end_matches(['\n', '\r']));
    }
}

pub(crate) fn describe_status(status: ExitStatus) -> String {
    status.code().map_or_else(
        || "termination by signal".to_string(),
        |code| format!("exit code {code}"),
    )
}

async fn output_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

/// Removes a render's output file unless the render is kept. Runs on drop,
/// so a cancelled render cleans up as well as a failed one.
struct PendingOutput<'a> {
    path: &'a Path,
    kept: bool,
}

impl<'a> PendingOutput<'a> {
    const fn new(path: &'a Path) -> Self {
        Self { path, kept: false }
    }

    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PendingOutput<'_> {
    fn drop(&mut self) {
        if self.kept {
            return;
        }

        match std::fs::remove_file(self.path) {
            Ok(()) => {
                tracing::warn!("removed partial output {}", self.path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "failed to remove partial output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
