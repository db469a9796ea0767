//! Monthly assignment endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::user::ActingUser;
use crate::error::ConteoResult;
use crate::models::{AssignmentAsset, AssignmentView, CountRecord};
use crate::services::{CountLedger, LifecycleController};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InactiveCountResponse {
    pub assignment_id: Uuid,
    pub count: i64,
}

/// GET /api/asignaciones/:id
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> ConteoResult<Json<AssignmentView>> {
    let view = CountLedger::new(state.db.clone())
        .get_assignment_view(assignment_id)
        .await?;
    Ok(Json(view))
}

/// GET /api/asignaciones/:id/activos
pub async fn assets_of_month(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> ConteoResult<Json<Vec<AssignmentAsset>>> {
    let assets = CountLedger::new(state.db.clone())
        .assets_of_month(assignment_id)
        .await?;
    Ok(Json(assets))
}

/// GET /api/asignaciones/:id/registros
pub async fn records_of_month(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> ConteoResult<Json<Vec<CountRecord>>> {
    let records = CountLedger::new(state.db.clone())
        .records_of_month(assignment_id)
        .await?;
    Ok(Json(records))
}

/// GET /api/asignaciones/:id/desactivados
pub async fn inactive_registry_count(
    State(state): State<AppState>,
    Path(assignment_id): Path<Uuid>,
) -> ConteoResult<Json<InactiveCountResponse>> {
    let count = CountLedger::new(state.db.clone())
        .inactive_registry_count(assignment_id)
        .await?;
    Ok(Json(InactiveCountResponse { assignment_id, count }))
}

/// POST /api/asignaciones/:id/confirmar
pub async fn confirm_month(
    State(state): State<AppState>,
    user: ActingUser,
    Path(assignment_id): Path<Uuid>,
) -> ConteoResult<Json<AssignmentView>> {
    let view = LifecycleController::new(state.db.clone())
        .confirm_month(assignment_id, user.as_str())
        .await?;
    Ok(Json(view))
}

pub fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/api/asignaciones/:id", get(get_assignment))
        .route("/api/asignaciones/:id/activos", get(assets_of_month))
        .route("/api/asignaciones/:id/registros", get(records_of_month))
        .route("/api/asignaciones/:id/desactivados", get(inactive_registry_count))
        .route("/api/asignaciones/:id/confirmar", post(confirm_month))
}
