//! POST /api/music/generate — text-to-music submission
//!
//! Accepts a JSON body or a multipart form (the latter when a guide-audio
//! clip rides along). The response carries only the task id; the caller
//! polls the status endpoint for the outcome. This handler never waits on
//! the provider.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Map, Value};
use tracing::info;
use tunegen_common::types::SubmitResponse;

use crate::error::{ApiError, ApiResult};
use crate::models::{intake, TaskRecord};
use crate::services::GenerateJob;
use crate::AppState;

/// Upper bound for a JSON submission body; uploads go through multipart
const JSON_BODY_LIMIT: usize = 256 * 1024;

/// POST /api/music/generate
pub async fn generate_music(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<SubmitResponse>> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (fields, upload) = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?;
        super::collect_form(multipart).await?
    } else {
        // An absent or malformed JSON body degrades to all-defaults
        let bytes = axum::body::to_bytes(req.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read request body: {e}")))?;
        let value: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        let map = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        (map, None)
    };

    let prompt = intake::coerce_text(fields.get("description"), intake::DEFAULT_GENERATE_PROMPT);
    let genres = intake::coerce_tags(fields.get("genres"));
    let moods = intake::coerce_tags(fields.get("moods"));
    let duration = intake::coerce_duration(fields.get("duration"));

    // Persist the guide clip before the task id exists, so the job can
    // reference it by path
    let guide_audio = match upload {
        Some((filename, bytes)) => {
            Some(intake::save_upload(&state.config.tmp_dir, &filename, &bytes).await?)
        }
        None => None,
    };

    let record = TaskRecord::new();
    let task_id = record.task_id.clone();
    state.registry.insert(record).await;

    info!(
        task_id = %task_id,
        duration = duration,
        guided = guide_audio.is_some(),
        "generate job accepted"
    );

    state.jobs.submit_generate(
        task_id.clone(),
        GenerateJob {
            prompt,
            genres,
            moods,
            duration,
            guide_audio,
        },
    );

    Ok(Json(SubmitResponse { task_id }))
}

/// Build generate routes
pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/api/music/generate", post(generate_music))
}
