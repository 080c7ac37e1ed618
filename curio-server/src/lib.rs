//! HTTP API for the Curio visibility engine.
//!
//! Admin routes manage restriction rules and trigger recomputes; user
//! routes manage the caller's own hidden entities. The authenticated
//! principal arrives in forwarded headers (see [`auth`]).

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use curio_visibility::{
    ExclusionStore, HiddenEntityManager, RecomputeCoordinator, RuleStore, StatsAggregator,
};

pub mod auth;
pub mod dto;
pub mod error;
mod handlers;

/// Shared state handed to every handler.
pub struct AppState {
    pub rules: RuleStore,
    pub hidden: HiddenEntityManager,
    pub exclusions: ExclusionStore,
    pub stats: StatsAggregator,
    pub coordinator: RecomputeCoordinator,
}

/// Build the HTTP API router with the given engine state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/restrictions/{user_id}",
            get(handlers::get_restrictions)
                .put(handlers::put_restrictions)
                .delete(handlers::delete_restrictions),
        )
        .route("/api/v1/recompute/{user_id}", post(handlers::recompute_user))
        .route("/api/v1/recompute-all", post(handlers::recompute_all))
        .route("/api/v1/stats", get(handlers::get_stats))
        .route(
            "/api/v1/hidden-entities",
            get(handlers::list_hidden).post(handlers::hide_entity),
        )
        .route("/api/v1/hidden-entities/bulk", post(handlers::bulk_hide))
        .route("/api/v1/hidden-entities/ids", get(handlers::hidden_ids))
        .route("/api/v1/hidden-entities/all", delete(handlers::unhide_all))
        .route(
            "/api/v1/hidden-entities/{entity_type}/{entity_id}",
            delete(handlers::unhide_entity),
        )
        .with_state(state)
}
