use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rv_render::{RenderError, RenderId, RenderJob, Workspace};
use types::{
    DEFAULT_DURATION_IN_FRAMES, HealthResponse, RenderRequest, RenderResult,
};

use crate::error::ApiError;
use crate::state::AppContext;

/// URL prefix the output directory is served under.
pub const VIDEOS_PATH: &str = "/videos";

#[must_use]
pub fn video_url(id: RenderId) -> String {
    format!("{VIDEOS_PATH}/{}", id.video_file_name())
}

#[derive(Debug, PartialEq, Eq)]
struct ValidRequest {
    code: String,
    duration_in_frames: u32,
}

fn validate(request: RenderRequest) -> Result<ValidRequest, ApiError> {
    let code = match request.code {
        Some(code) if !code.is_empty() => code,
        _ => return Err(ApiError::bad_request("No code provided")),
    };

    let duration_in_frames = match request.duration_in_frames {
        None => DEFAULT_DURATION_IN_FRAMES,
        Some(frames) => u32::try_from(frames)
            .ok()
            .filter(|frames| *frames > 0)
            .ok_or_else(|| {
                ApiError::bad_request(
                    "durationInFrames must be a positive integer",
                )
            })?,
    };

    Ok(ValidRequest {
        code,
        duration_in_frames,
    })
}

/// `POST /render`: stage the submitted component, render it, and answer with
/// the URL of the finished video.
pub async fn render_handler(
    State(context): State<AppContext>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResult>, ApiError> {
    tracing::info!("received render request");

    let Json(request) = payload?;
    let request = validate(request)?;

    let _slot = context.acquire_render_slot().await.map_err(|e| {
        ApiError::internal(format!("render slots unavailable: {e}"))
    })?;

    let id = context.next_render_id();
    let workspace = Workspace::create(context.temp_dir(), id).await?;

    let result = render_in_workspace(&context, &workspace, &request, id).await;

    // a cancelled request drops `workspace`, which removes it
    if context.cleanup_policy().should_teardown(result.is_ok()) {
        workspace.teardown().await;
    } else {
        let kept = workspace.keep();
        tracing::warn!("keeping workspace of failed render at {}", kept.display());
    }

    result?;

    let video_url = video_url(id);
    tracing::info!("video rendered successfully: {}", video_url);

    Ok(Json(RenderResult::succeeded(video_url)))
}

#[tracing::instrument(skip_all, fields(render_id = %id))]
async fn render_in_workspace(
    context: &AppContext,
    workspace: &Workspace,
    request: &ValidRequest,
    id: RenderId,
) -> Result<(), RenderError> {
    workspace
        .stage(&request.code, request.duration_in_frames)
        .await?;

    let job = RenderJob::for_workspace(workspace, context.output().video_path(id));
    let outcome = context.engine().render(&job).await?;

    if let Some(composition) = outcome.composition {
        tracing::debug!(
            "rendered composition {} with {} frames",
            composition.id,
            composition.duration_in_frames
        );
    }

    Ok(())
}

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(code: Option<&str>, frames: Option<i64>) -> RenderRequest {
        RenderRequest {
            code: code.map(ToString::to_string),
            duration_in_frames: frames,
        }
    }

    #[test]
    fn test_validate_defaults_duration() {
        assert_eq!(
            validate(request(Some("code"), None)).unwrap(),
            ValidRequest {
                code: "code".to_string(),
                duration_in_frames: 150,
            }
        );
    }

    #[test]
    fn test_validate_rejects_missing_code() {
        for missing in [request(None, Some(30)), request(Some(""), None)] {
            let err = validate(missing).unwrap_err();
            assert_eq!(err.to_string(), "No code provided");
        }
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        for frames in [0, -5, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                validate(request(Some("code"), Some(frames))),
                Err(ApiError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_video_url() {
        assert_eq!(
            video_url(RenderId::from(1_700_000_000_000)),
            "/videos/video-1700000000000.mp4"
        );
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health_handler().await;

        assert_eq!(body.status, "ok");
    }
}
