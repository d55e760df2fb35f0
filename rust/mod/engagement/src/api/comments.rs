use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;

use ticket_core::ServiceError;

use crate::api::AppState;
use crate::model::{CreateComment, UpdateComment};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reviews/{review_id}/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/comments/{review_id}/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
}

/// POST /reviews/{review_id}/comments
async fn create_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    let id = state.engine.create_comment(&review_id, &principal, input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "message": state.i18n.t("message.comment.created", &[]),
        })),
    ))
}

/// GET /reviews/{review_id}/comments — public.
async fn list_comments(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let comments = state.engine.list_comments(&review_id)?;
    Ok(Json(json!({"comments": comments})))
}

/// PUT /comments/{review_id}/{comment_id}
async fn update_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((review_id, comment_id)): Path<(String, String)>,
    Json(input): Json<UpdateComment>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state
        .engine
        .update_comment(&review_id, &comment_id, &principal, input)?;
    Ok(Json(json!({"success": true})))
}

/// DELETE /comments/{review_id}/{comment_id}
async fn delete_comment(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((review_id, comment_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state
        .engine
        .delete_comment(&review_id, &comment_id, &principal)?;
    Ok(Json(json!({"success": true})))
}
