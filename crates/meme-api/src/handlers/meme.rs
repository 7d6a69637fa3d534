//! Meme generation handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use meme_generator::MemeOutcome;
use meme_models::GenerateMemeRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Filename offered to the client for the rendered video.
pub const DOWNLOAD_FILENAME: &str = "meme.mp4";

/// Generate a meme from four source URLs and return the video.
pub async fn generate_meme(
    State(state): State<AppState>,
    payload: Result<Json<GenerateMemeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    request.validate().map_err(ApiError::bad_request)?;

    info!(urls = request.urls.len(), "Meme generation requested");

    match state.generator.generate(&request.urls).await? {
        MemeOutcome::Done { output_path, video } => {
            info!(output = %output_path.display(), bytes = video.len(), "Meme generated");
            Ok((
                [
                    (header::CONTENT_TYPE, "video/mp4".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
                    ),
                ],
                video,
            )
                .into_response())
        }
        MemeOutcome::Aborted { fetched, required } => {
            warn!(fetched, required, "Meme generation aborted");
            Err(ApiError::generation_failed(format!(
                "only {}/{} audio clips could be downloaded",
                fetched, required
            )))
        }
    }
}
