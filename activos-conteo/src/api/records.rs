//! Count record endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::user::ActingUser;
use crate::error::ConteoResult;
use crate::models::{CountInput, CountRecord, CountRecordPatch};
use crate::services::CountLedger;
use crate::AppState;

/// POST /api/registros/:id/desactivar request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    #[serde(default, alias = "motivo")]
    pub reason: Option<String>,
}

/// POST /api/registros
pub async fn register_count(
    State(state): State<AppState>,
    user: ActingUser,
    Json(input): Json<CountInput>,
) -> ConteoResult<(StatusCode, Json<CountRecord>)> {
    let record = CountLedger::new(state.db.clone())
        .register_count(input, user.as_str())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /api/registros/:id
pub async fn update_record(
    State(state): State<AppState>,
    user: ActingUser,
    Path(record_id): Path<Uuid>,
    Json(patch): Json<CountRecordPatch>,
) -> ConteoResult<Json<CountRecord>> {
    let record = CountLedger::new(state.db.clone())
        .update_count_record(record_id, patch, user.as_str())
        .await?;
    Ok(Json(record))
}

/// POST /api/registros/:id/desactivar
pub async fn deactivate_record(
    State(state): State<AppState>,
    user: ActingUser,
    Path(record_id): Path<Uuid>,
    request: Option<Json<DeactivateRequest>>,
) -> ConteoResult<Json<CountRecord>> {
    let Json(request) = request.unwrap_or_default();
    let record = CountLedger::new(state.db.clone())
        .deactivate_record(record_id, request.reason, user.as_str())
        .await?;
    Ok(Json(record))
}

/// POST /api/registros/:id/reactivar
pub async fn reactivate_record(
    State(state): State<AppState>,
    user: ActingUser,
    Path(record_id): Path<Uuid>,
    Json(patch): Json<CountRecordPatch>,
) -> ConteoResult<Json<CountRecord>> {
    let record = CountLedger::new(state.db.clone())
        .reactivate_record(record_id, patch, user.as_str())
        .await?;
    Ok(Json(record))
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/api/registros", post(register_count))
        .route("/api/registros/:id", patch(update_record))
        .route("/api/registros/:id/desactivar", post(deactivate_record))
        .route("/api/registros/:id/reactivar", post(reactivate_record))
}
