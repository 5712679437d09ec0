use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rv_render::{OutputDirError, RenderError};
use thiserror::Error;
use types::RenderResult;

/// Failure of a request, rendered as a `RenderResult` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Body that could not be read as a render request.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE
            || status == StatusCode::UNSUPPORTED_MEDIA_TYPE
        {
            status
        } else {
            StatusCode::BAD_REQUEST
        };

        Self::Rejected {
            status,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("render request failed: {}", self);
        } else {
            tracing::warn!("rejected render request: {}", self);
        }

        let output = match &self {
            Self::Render(e) => e.output().map(ToString::to_string),
            _ => None,
        };

        (status, Json(RenderResult::failed(self.to_string(), output)))
            .into_response()
    }
}

/// Failure to build the application context at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    OutputDir(#[from] OutputDirError),
    #[error(transparent)]
    Engine(#[from] RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;

    async fn body_of(error: ApiError) -> (StatusCode, RenderResult) {
        let response = error.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request() {
        let (status, body) =
            body_of(ApiError::bad_request("No code provided")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, RenderResult::failed("No code provided", None));
    }

    #[tokio::test]
    async fn test_engine_failure_includes_output() {
        let (status, body) = body_of(ApiError::from(RenderError::EngineFailed {
            status: "exit code 1".to_string(),
            output: "Bundling...\n".to_string(),
        }))
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            RenderResult::failed(
                "Render failed with exit code 1",
                Some("Bundling...\n".to_string())
            )
        );
    }

    #[tokio::test]
    async fn test_missing_content_type_keeps_rejection_status() {
        let rejection = JsonRejection::from(
            axum::extract::rejection::MissingJsonContentType::default(),
        );

        let (status, body) = body_of(ApiError::from(rejection)).await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!body.success);
        assert!(body.error.is_some());
    }

    #[tokio::test]
    async fn test_internal_error() {
        let (status, body) = body_of(ApiError::internal("boom")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, RenderResult::failed("boom", None));
    }
}
