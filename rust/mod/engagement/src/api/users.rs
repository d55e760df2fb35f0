use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::json;

use ticket_core::ServiceError;

use crate::api::AppState;
use crate::model::UpdateProfile;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{uid}", get(get_profile).put(update_profile))
        .route("/users/{uid}/sync-liked-count", put(sync_liked_count))
}

/// GET /users/{uid} — public.
async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let profile = state.engine.get_profile(&uid)?;
    Ok(Json(serde_json::to_value(profile).unwrap()))
}

/// PUT /users/{uid} — self only.
async fn update_profile(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    let profile = state.engine.update_profile(&uid, &principal, input)?;
    Ok(Json(serde_json::to_value(profile).unwrap()))
}

/// PUT /users/{uid}/sync-liked-count — self only. Repairs the cached
/// liked-tickets counter from the authoritative like records.
async fn sync_liked_count(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let principal = state.gate.verify_credential(&headers).map_err(ServiceError::from)?;
    state
        .gate
        .verify_ownership(&principal.uid, &uid)
        .map_err(ServiceError::from)?;
    let report = state.reconciler.reconcile_liked_count(&uid)?;
    Ok(Json(json!({
        "before": report.before,
        "after": report.after,
        "difference": report.difference,
    })))
}
