//! Plan endpoints
//!
//! POST /api/planes, GET /api/planes[/actual|/:id], statistics, lifecycle
//! actions and late-asset redistribution.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::ActingUser;
use crate::error::ConteoResult;
use crate::models::{AnnualCountPlan, PlanDetail, PlanStats};
use crate::services::{aggregator, LifecycleController, PlanManager};
use crate::AppState;

/// POST /api/planes request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanRequest {
    pub year: i32,
    #[serde(default)]
    pub observations: Option<String>,
}

/// POST /api/planes/:id/finalizar request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePlanRequest {
    #[serde(default, alias = "motivo")]
    pub reason: Option<String>,
}

/// PUT /api/planes/:id/observaciones request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationsRequest {
    #[serde(default)]
    pub observations: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedistributeResponse {
    pub plan_id: Uuid,
    pub appended: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignedCountResponse {
    pub plan_id: Uuid,
    pub count: usize,
}

/// POST /api/planes
pub async fn generate_plan(
    State(state): State<AppState>,
    user: ActingUser,
    Json(request): Json<GeneratePlanRequest>,
) -> ConteoResult<(StatusCode, Json<PlanDetail>)> {
    let detail = PlanManager::new(state.db.clone())
        .generate_plan(request.year, user.as_str(), request.observations)
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/planes/actual
///
/// `null` when no plan exists yet.
pub async fn current_plan(State(state): State<AppState>) -> ConteoResult<Json<Option<AnnualCountPlan>>> {
    let plan = PlanManager::new(state.db.clone()).current_plan().await?;
    Ok(Json(plan))
}

/// GET /api/planes
pub async fn list_plans(State(state): State<AppState>) -> ConteoResult<Json<Vec<AnnualCountPlan>>> {
    let plans = PlanManager::new(state.db.clone()).list_plans().await?;
    Ok(Json(plans))
}

/// GET /api/planes/:id
pub async fn get_plan(State(state): State<AppState>, Path(plan_id): Path<Uuid>) -> ConteoResult<Json<PlanDetail>> {
    let detail = PlanManager::new(state.db.clone()).get_plan_detail(plan_id).await?;
    Ok(Json(detail))
}

/// GET /api/planes/:id/estadisticas
pub async fn plan_stats(State(state): State<AppState>, Path(plan_id): Path<Uuid>) -> ConteoResult<Json<PlanStats>> {
    let mut conn = state.db.acquire().await?;
    let stats = aggregator::plan_stats(&mut *conn, plan_id, state.top_areas_limit).await?;
    Ok(Json(stats))
}

/// POST /api/planes/:id/iniciar
pub async fn start_plan(
    State(state): State<AppState>,
    user: ActingUser,
    Path(plan_id): Path<Uuid>,
) -> ConteoResult<Json<AnnualCountPlan>> {
    let plan = LifecycleController::new(state.db.clone())
        .start_plan(plan_id, user.as_str())
        .await?;
    Ok(Json(plan))
}

/// POST /api/planes/:id/finalizar
///
/// The body is optional; an absent or empty body finalizes without a reason.
pub async fn finalize_plan(
    State(state): State<AppState>,
    user: ActingUser,
    Path(plan_id): Path<Uuid>,
    request: Option<Json<FinalizePlanRequest>>,
) -> ConteoResult<Json<AnnualCountPlan>> {
    let Json(request) = request.unwrap_or_default();
    let plan = LifecycleController::new(state.db.clone())
        .finalize_plan(plan_id, request.reason, user.as_str())
        .await?;
    Ok(Json(plan))
}

/// PUT /api/planes/:id/observaciones
pub async fn update_observations(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<ObservationsRequest>,
) -> ConteoResult<Json<AnnualCountPlan>> {
    let plan = LifecycleController::new(state.db.clone())
        .update_observations(plan_id, request.observations)
        .await?;
    Ok(Json(plan))
}

/// POST /api/planes/:id/redistribuir
pub async fn redistribute(
    State(state): State<AppState>,
    user: ActingUser,
    Path(plan_id): Path<Uuid>,
) -> ConteoResult<Json<RedistributeResponse>> {
    let appended = PlanManager::new(state.db.clone())
        .redistribute_new_assets(plan_id, user.as_str())
        .await?;
    Ok(Json(RedistributeResponse { plan_id, appended }))
}

/// GET /api/planes/:id/activos-nuevos
pub async fn unassigned_count(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> ConteoResult<Json<UnassignedCountResponse>> {
    let count = PlanManager::new(state.db.clone())
        .count_unassigned_new_assets(plan_id)
        .await?;
    Ok(Json(UnassignedCountResponse { plan_id, count }))
}

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/planes", post(generate_plan).get(list_plans))
        .route("/api/planes/actual", get(current_plan))
        .route("/api/planes/:id", get(get_plan))
        .route("/api/planes/:id/estadisticas", get(plan_stats))
        .route("/api/planes/:id/iniciar", post(start_plan))
        .route("/api/planes/:id/finalizar", post(finalize_plan))
        .route("/api/planes/:id/observaciones", put(update_observations))
        .route("/api/planes/:id/redistribuir", post(redistribute))
        .route("/api/planes/:id/activos-nuevos", get(unassigned_count))
}
