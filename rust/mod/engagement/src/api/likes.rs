use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

use ticket_core::ServiceError;

use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/reviews/{review_id}/like", post(like).delete(unlike))
}

/// POST /reviews/{review_id}/like
async fn like(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    let like_count = state.engine.like(&review_id, &principal.uid)?;
    Ok((StatusCode::CREATED, Json(json!({"likeCount": like_count}))))
}

/// DELETE /reviews/{review_id}/like
async fn unlike(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state.engine.unlike(&review_id, &principal.uid)?;
    Ok(Json(json!({"success": true})))
}
