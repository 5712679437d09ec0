//! Bundle → select composition → render pipeline.
//!
//! The pipeline runs inside the engine's own runtime through a small driver
//! script. The driver reports each step as one JSON object per stdout line,
//! which [`PipelineMonitor`] turns into log lines and a final outcome.

use std::process::ExitStatus;

use serde::Deserialize;

use crate::engine::{RenderOutcome, describe_status};
use crate::RenderError;

/// Driver run by the default pipeline command.
///
/// Arguments: `<entry> <composition-id> <output> <codec>`.
pub const DRIVER_SCRIPT: &str = r"
const [entry, compositionId, output, codec] = process.argv.slice(1);
const emit = (event) => console.log(JSON.stringify(event));
try {
  const { bundle } = await import('@remotion/bundler');
  const { selectComposition, renderMedia } = await import('@remotion/renderer');
  const serveUrl = await bundle({
    entryPoint: entry,
    onProgress: (progress) => emit({ event: 'progress', stage: 'bundle', progress: progress / 100 }),
  });
  const composition = await selectComposition({ serveUrl, id: compositionId, inputProps: {} });
  emit({
    event: 'composition',
    id: composition.id,
    durationInFrames: composition.durationInFrames,
    fps: composition.fps,
    width: composition.width,
    height: composition.height,
  });
  await renderMedia({
    composition,
    serveUrl,
    codec,
    outputLocation: output,
    inputProps: {},
    onProgress: ({ progress }) => emit({ event: 'progress', stage: 'render', progress }),
  });
  emit({ event: 'done' });
} catch (error) {
  emit({ event: 'error', message: error instanceof Error ? error.message : String(error) });
  process.exitCode = 1;
}
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Bundle,
    Render,
}

/// Composition as resolved by the engine against the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionInfo {
    pub id: String,
    pub duration_in_frames: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Progress { stage: PipelineStage, progress: f64 },
    Composition(CompositionInfo),
    Done,
    Error { message: String },
}

/// Consumes driver stdout line by line.
#[derive(Debug, Default)]
pub struct PipelineMonitor {
    output: String,
    composition: Option<CompositionInfo>,
    completed: bool,
    failure: Option<String>,
}

impl PipelineMonitor {
    pub fn observe(&mut self, line: &str) {
        let event = match serde_json::from_str::<PipelineEvent>(line) {
            Ok(event) => event,
            Err(_) => {
                // engine chatter, kept for diagnostics
                tracing::info!("{}", line);
                self.output.push_str(line);
                self.output.push('\n');
                return;
            }
        };

        match event {
            PipelineEvent::Progress { stage, progress } => {
                tracing::info!("{:?} progress: {:.0}%", stage, progress * 100.0);
            }
            PipelineEvent::Composition(composition) => {
                tracing::info!(
                    "resolved composition {} ({} frames at {} fps, {}x{})",
                    composition.id,
                    composition.duration_in_frames,
                    composition.fps,
                    composition.width,
                    composition.height
                );
                self.composition = Some(composition);
            }
            PipelineEvent::Done => self.completed = true,
            PipelineEvent::Error { message } => {
                tracing::error!("render pipeline error: {}", message);
                self.failure.get_or_insert(message);
            }
        }
    }

    /// Decide the outcome once the driver has exited.
    ///
    /// # Errors
    /// If the driver reported an error, exited unsuccessfully, or exited
    /// without reporting completion.
    pub fn finish(
        self,
        status: ExitStatus,
    ) -> Result<RenderOutcome, RenderError> {
        if let Some(message) = self.failure {
            return Err(RenderError::PipelineFailed {
                message,
                output: self.output,
            });
        }

        if !status.success() {
            return Err(RenderError::EngineFailed {
                status: describe_status(status),
                output: self.output,
            });
        }

        if !self.completed {
            return Err(RenderError::PipelineFailed {
                message: "driver exited without completing the render"
                    .to_string(),
                output: self.output,
            });
        }

        Ok(RenderOutcome {
            output: self.output,
            composition: self.composition,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::os::unix::process::ExitStatusExt;

    fn exited(code: i32) -> ExitStatus {
        ExitStatus::from_raw(code << 8)
    }

    #[test]
    fn test_parses_events() {
        let event: PipelineEvent = serde_json::from_str(
            r#"{"event":"progress","stage":"bundle","progress":0.25}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PipelineEvent::Progress {
                stage: PipelineStage::Bundle,
                progress: 0.25
            }
        );

        let event: PipelineEvent = serde_json::from_str(
            r#"{"event":"composition","id":"MyVideo","durationInFrames":150,"fps":30,"width":1920,"height":1080}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PipelineEvent::Composition(CompositionInfo {
                id: "MyVideo".to_string(),
                duration_in_frames: 150,
                fps: 30,
                width: 1920,
                height: 1080,
            })
        );
    }

    #[test]
    fn test_completed_pipeline() {
        let mut monitor = PipelineMonitor::default();
        monitor.observe(r#"{"event":"progress","stage":"bundle","progress":1}"#);
        monitor.observe(
            r#"{"event":"composition","id":"MyVideo","durationInFrames":60,"fps":30,"width":1920,"height":1080}"#,
        );
        monitor.observe("Rendered frame 60/60");
        monitor.observe(r#"{"event":"done"}"#);

        let outcome = monitor.finish(exited(0)).unwrap();

        assert_eq!(outcome.output, "Rendered frame 60/60\n");
        assert_eq!(
            outcome.composition.map(|c| c.duration_in_frames),
            Some(60)
        );
    }

    #[test]
    fn test_error_event_fails_pipeline() {
        let mut monitor = PipelineMonitor::default();
        monitor.observe(r#"{"event":"error","message":"No composition with the ID MyVideo"}"#);
        monitor.observe(r#"{"event":"error","message":"second"}"#);

        let err = monitor.finish(exited(1)).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Render pipeline failed: No composition with the ID MyVideo"
        );
    }

    #[test]
    fn test_nonzero_exit_fails_pipeline() {
        let mut monitor = PipelineMonitor::default();
        monitor.observe("Cannot find module '@remotion/bundler'");

        let err = monitor.finish(exited(1)).unwrap_err();

        assert_eq!(err.to_string(), "Render failed with exit code 1");
        assert_eq!(err.output(), Some("Cannot find module '@remotion/bundler'\n"));
    }

    #[test]
    fn test_missing_done_fails_pipeline() {
        let mut monitor = PipelineMonitor::default();
        monitor.observe(r#"{"event":"progress","stage":"render","progress":0.5}"#);

        let err = monitor.finish(exited(0)).unwrap_err();

        assert!(matches!(err, RenderError::PipelineFailed { .. }));
    }
}
