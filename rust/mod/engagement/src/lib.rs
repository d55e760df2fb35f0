//! Engagement module — reviews, comments, likes, and the machinery
//! that keeps their derived counters honest.
//!
//! # Components
//!
//! - **EngagementEngine** — atomic create/update/delete operations, each
//!   pairing the primary write with its counter update in one store
//!   transaction
//! - **ActivityPropagator** — recomputes a user's activity tier and fans
//!   it out to denormalized comment copies, off the request path
//! - **CounterReconciler** — recomputes drifted counters from the
//!   authoritative records and overwrites them
//!
//! # Usage
//!
//! ```ignore
//! use ticket_engagement::EngagementModule;
//!
//! let module = EngagementModule::new(store, gate, metadata, i18n);
//! let router = module.routes();
//! ```

pub mod api;
pub mod model;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;

use ticket_auth::AuthGate;
use ticket_core::{Localizer, Module};
use ticket_docstore::DocumentStore;
use ticket_metadata::MetadataService;

use api::{AppState, AppStateInner};
use service::{ActivityPropagator, CounterReconciler, EngagementEngine};
use store::EngagementStore;

/// The engagement module. Owns the engine, propagator and reconciler
/// and exposes their HTTP routes.
pub struct EngagementModule {
    state: AppState,
}

impl EngagementModule {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        gate: Arc<AuthGate>,
        metadata: Arc<MetadataService>,
        i18n: Arc<dyn Localizer>,
    ) -> Self {
        let store = EngagementStore::new(store);
        let propagator = Arc::new(ActivityPropagator::new(store.clone()));
        let state = Arc::new(AppStateInner {
            engine: EngagementEngine::new(
                store.clone(),
                Arc::clone(&gate),
                propagator,
                Arc::clone(&i18n),
            ),
            reconciler: CounterReconciler::new(store, Arc::clone(&i18n)),
            gate,
            metadata,
            i18n,
        });
        Self { state }
    }
}

impl Module for EngagementModule {
    fn name(&self) -> &str {
        "engagement"
    }

    fn routes(&self) -> Router {
        api::build_router(Arc::clone(&self.state))
    }
}
