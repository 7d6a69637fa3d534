//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use meme_media::{check_ffmpeg, check_ffprobe, check_ytdlp, MediaResult};

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub ffmpeg: CheckStatus,
    pub ffprobe: CheckStatus,
    pub yt_dlp: CheckStatus,
    pub background_video: CheckStatus,
}

impl ReadinessChecks {
    fn all_ok(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe, &self.yt_dlp, &self.background_video]
            .iter()
            .all(|c| c.is_ok())
    }
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckStatus {
    fn ok(path: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            path: Some(path.into()),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            path: None,
            error: Some(msg.into()),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn from_tool(found: MediaResult<std::path::PathBuf>) -> Self {
        match found {
            Ok(path) => Self::ok(path.display().to_string()),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the external tools and the background video.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let video = &state.generator.config().background_video_path;
    let background_video = if video.is_file() {
        CheckStatus::ok(video.display().to_string())
    } else {
        CheckStatus::error(format!("{} not found", video.display()))
    };

    let checks = ReadinessChecks {
        ffmpeg: CheckStatus::from_tool(check_ffmpeg()),
        ffprobe: CheckStatus::from_tool(check_ffprobe()),
        yt_dlp: CheckStatus::from_tool(check_ytdlp()),
        background_video,
    };

    let all_ok = checks.all_ok();
    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
