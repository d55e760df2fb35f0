mod comments;
mod likes;
mod reviews;
mod users;

use std::sync::Arc;

use axum::Router;

use ticket_auth::AuthGate;
use ticket_core::Localizer;
use ticket_metadata::MetadataService;

use crate::service::engine::EngagementEngine;
use crate::service::reconciler::CounterReconciler;

/// Shared application state for the engagement handlers.
pub struct AppStateInner {
    pub engine: EngagementEngine,
    pub reconciler: CounterReconciler,
    pub gate: Arc<AuthGate>,
    pub metadata: Arc<MetadataService>,
    pub i18n: Arc<dyn Localizer>,
}

pub type AppState = Arc<AppStateInner>;

/// Build the complete engagement API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(reviews::routes())
        .merge(comments::routes())
        .merge(likes::routes())
        .merge(users::routes())
        .with_state(state)
}
