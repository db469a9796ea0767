//! activos-conteo library - Annual cyclic count of tangible fixed assets
//!
//! Distributes the active registry across ten monthly assignments
//! (September to June), records each asset's count, and drives the plan
//! through draft, in progress and completed.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ConteoError, ConteoResult};

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Areas reported in the plan discrepancy ranking
    pub top_areas_limit: usize,
}

impl AppState {
    pub fn new(db: SqlitePool, top_areas_limit: usize) -> Self {
        Self { db, top_areas_limit }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::plan_routes())
        .merge(api::assignment_routes())
        .merge(api::record_routes())
        .merge(api::registry_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
