use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use vos_protocol::endpoints;
use vos_staging::StagingService;

use crate::auth::AuthProvider;
use crate::handler;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StagingService>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(service: Arc<StagingService>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { service, auth }
    }
}

/// Build the axum router with all VOS endpoints.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::INFO, get(handler::info_handler))
        .route(
            endpoints::REPOSITORIES,
            get(handler::list_repositories).post(handler::create_repository),
        )
        .route(
            endpoints::BRANCHES,
            get(handler::list_branches).post(handler::create_branch),
        )
        .route(endpoints::BRANCH, delete(handler::delete_branch))
        .route(
            endpoints::STAGING_BACKING,
            get(handler::get_staging_location).put(handler::link_staging_location),
        )
        .route(endpoints::OBJECT_STAT, get(handler::stat_object))
        .route(endpoints::OBJECTS, delete(handler::delete_object))
        .route(endpoints::COMMITS, post(handler::commit))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
