//! # retro-api
//!
//! REST API layer for Retro. Role administration, retrospectives with their
//! items and groups, and the voting phase, all behind JWT bearer auth.

pub mod middleware;
pub mod routes;

use axum::Router;
use retro_db::Database;
use retro_voting::{PgVoteStore, VotingSessionManager};
use std::sync::Arc;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Open voting sessions. The in-memory trackers are authoritative while
    /// voting is open; writes reach Postgres in order through a background writer.
    pub voting: VotingSessionManager<PgVoteStore>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        let voting = VotingSessionManager::new(Arc::new(PgVoteStore::new(db.clone())));
        Self { db, voting }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let authed = Router::new()
        .merge(routes::roles::router())
        .merge(routes::retrospectives::router())
        .merge(routes::voting::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let api_routes = Router::new()
        .merge(authed)
        .merge(routes::health::router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
