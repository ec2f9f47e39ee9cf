//! POST /api/music/convert — audio-guided style conversion
//!
//! Multipart only: the source clip is required. A submission without a file
//! still gets a task id back, with the task already recorded as failed, so
//! the polling contract holds for every response this endpoint produces.

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{info, warn};
use tunegen_common::types::SubmitResponse;

use crate::error::ApiResult;
use crate::models::{intake, TaskRecord};
use crate::services::ConvertJob;
use crate::AppState;

/// POST /api/music/convert
pub async fn convert_music(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    let (fields, upload) = super::collect_form(multipart).await?;

    // Persist the clip before the task id exists
    let saved = match upload {
        Some((filename, bytes)) => {
            Some(intake::save_upload(&state.config.tmp_dir, &filename, &bytes).await?)
        }
        None => None,
    };

    let record = TaskRecord::new();
    let task_id = record.task_id.clone();
    state.registry.insert(record).await;

    let Some(audio_path) = saved else {
        warn!(task_id = %task_id, "convert submitted without a file");
        state.registry.mark_failed(&task_id, "No file uploaded").await;
        return Ok(Json(SubmitResponse { task_id }));
    };

    let prompt = intake::coerce_text(fields.get("prompt"), intake::DEFAULT_CONVERT_PROMPT);
    let target_genre = intake::coerce_text(fields.get("targetGenre"), "");
    let intensity = intake::coerce_intensity(fields.get("intensity"));
    let duration = intake::coerce_duration(fields.get("duration"));

    info!(
        task_id = %task_id,
        target_genre = %target_genre,
        intensity = intensity,
        "convert job accepted"
    );

    state.jobs.submit_convert(
        task_id.clone(),
        ConvertJob {
            prompt,
            target_genre,
            intensity,
            duration,
            audio_path,
        },
    );

    Ok(Json(SubmitResponse { task_id }))
}

/// Build convert routes
pub fn convert_routes() -> Router<AppState> {
    Router::new().route("/api/music/convert", post(convert_music))
}
