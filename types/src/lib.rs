use serde::{Deserialize, Serialize};

/// Frame count used when a render request does not specify one.
pub const DEFAULT_DURATION_IN_FRAMES: u32 = 150;

/// Body of `POST /render`.
///
/// Both fields are optional at the wire level so that a missing `code` can be
/// reported as a client error instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_frames: Option<i64>,
}

/// Body of every `POST /render` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl RenderResult {
    #[must_use]
    pub fn succeeded(video_url: impl Into<String>) -> Self {
        Self {
            success: true,
            video_url: Some(video_url.into()),
            message: Some("Video rendered successfully".to_string()),
            error: None,
            output: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>, output: Option<String>) -> Self {
        Self {
            success: false,
            video_url: None,
            message: None,
            error: Some(error.into()),
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Remotion render server is running".to_string(),
        }
    }
}
