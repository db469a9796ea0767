//! Asset registry endpoints
//!
//! Thin wrappers over `activos_common::db::registry`. The registry owns the
//! asset-level active flag; count workflows only read it.

use activos_common::db::registry;
use activos_common::db::{Area, Asset, AssetFilter, NewAsset, Subclassification};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ConteoResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

/// PUT /api/activos/:id/estado request
#[derive(Debug, Deserialize)]
pub struct AssetStateRequest {
    pub active: bool,
}

/// GET /api/areas
pub async fn list_areas(State(state): State<AppState>) -> ConteoResult<Json<Vec<Area>>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(registry::list_areas(&mut *conn).await?))
}

/// POST /api/areas
pub async fn create_area(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> ConteoResult<(StatusCode, Json<Area>)> {
    let mut conn = state.db.acquire().await?;
    let area = registry::create_area(&mut *conn, &request.name).await?;
    Ok((StatusCode::CREATED, Json(area)))
}

/// GET /api/subclasificaciones
pub async fn list_subclassifications(
    State(state): State<AppState>,
) -> ConteoResult<Json<Vec<Subclassification>>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(registry::list_subclassifications(&mut *conn).await?))
}

/// POST /api/subclasificaciones
pub async fn create_subclassification(
    State(state): State<AppState>,
    Json(request): Json<NameRequest>,
) -> ConteoResult<(StatusCode, Json<Subclassification>)> {
    let mut conn = state.db.acquire().await?;
    let subclass = registry::create_subclassification(&mut *conn, &request.name).await?;
    Ok((StatusCode::CREATED, Json(subclass)))
}

/// GET /api/activos?active=true&areaId=...
pub async fn list_assets(
    State(state): State<AppState>,
    Query(filter): Query<AssetFilter>,
) -> ConteoResult<Json<Vec<Asset>>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(registry::list_assets(&mut *conn, &filter).await?))
}

/// POST /api/activos
pub async fn create_asset(
    State(state): State<AppState>,
    Json(request): Json<NewAsset>,
) -> ConteoResult<(StatusCode, Json<Asset>)> {
    let mut conn = state.db.acquire().await?;
    let asset = registry::create_asset(&mut *conn, &request).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// PUT /api/activos/:id/estado
pub async fn set_asset_state(
    State(state): State<AppState>,
    Path(asset_id): Path<Uuid>,
    Json(request): Json<AssetStateRequest>,
) -> ConteoResult<Json<Asset>> {
    let mut conn = state.db.acquire().await?;
    let asset = registry::set_asset_active(&mut *conn, asset_id, request.active).await?;
    Ok(Json(asset))
}

pub fn registry_routes() -> Router<AppState> {
    Router::new()
        .route("/api/areas", get(list_areas).post(create_area))
        .route(
            "/api/subclasificaciones",
            get(list_subclassifications).post(create_subclassification),
        )
        .route("/api/activos", get(list_assets).post(create_asset))
        .route("/api/activos/:id/estado", put(set_asset_state))
}
