//! GET /api/music/task/status — task polling endpoint

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

/// Query parameters; `taskId` is accepted as an alias of `task_id`
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    task_id: Option<String>,
    #[serde(rename = "taskId")]
    task_id_alias: Option<String>,
}

/// GET /api/music/task/status?task_id=<id>
pub async fn task_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let Some(task_id) = query.task_id.or(query.task_id_alias) else {
        return ApiError::BadRequest("missing task_id query parameter".to_string())
            .into_response();
    };

    match state.registry.get(&task_id).await {
        Some(record) => Json(record.to_status_response()).into_response(),
        // The polling frontend matches on this exact body shape
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "failed", "error": "Unknown task" })),
        )
            .into_response(),
    }
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/api/music/task/status", get(task_status))
}
