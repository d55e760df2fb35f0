use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;

use ticket_core::ServiceError;
use ticket_metadata::EnrichRequest;

use crate::api::AppState;
use crate::model::{CreateReview, UpdateReview};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route(
            "/reviews/{review_id}",
            get(get_review).put(update_review).delete(delete_review),
        )
        .route("/reviews/{review_id}/sync-counters", put(sync_counters))
}

/// POST /reviews
async fn create_review(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(input): Json<CreateReview>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    let id = state.engine.create_review(&principal, input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "message": state.i18n.t("message.review.created", &[]),
        })),
    ))
}

/// GET /reviews/{review_id} — public, decorated with best-effort metadata.
async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let review = state.engine.get_review(&review_id)?;
    let enrichment = state
        .metadata
        .enrich(&EnrichRequest {
            movie_id: review.movie_id,
            genre_ids: review.genre_ids.clone(),
        })
        .await;

    let mut value = serde_json::to_value(&review).unwrap();
    value["certification"] = json!(enrichment.certification);
    value["genreNames"] = json!(enrichment.genre_names);
    Ok(Json(value))
}

/// PUT /reviews/{review_id}
async fn update_review(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Json(input): Json<UpdateReview>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state.engine.update_review(&review_id, &principal, input)?;
    Ok(Json(json!({"success": true})))
}

/// DELETE /reviews/{review_id}
async fn delete_review(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state.engine.delete_review(&review_id, &principal)?;
    Ok(Json(json!({"success": true})))
}

/// PUT /reviews/{review_id}/sync-counters — authenticated repair of the
/// review's derived counters.
async fn sync_counters(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    let report = state.reconciler.reconcile_review_counters(&review_id)?;
    Ok(Json(serde_json::to_value(report).unwrap()))
}
