//! Error types for activos-conteo
//!
//! Every failure is recovered at the request boundary and rendered as
//! `{"error": {"code", "message"}}`; none is fatal to the process.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Count-plan error taxonomy
#[derive(Debug, Error)]
pub enum ConteoError {
    /// A plan already exists for the year
    #[error("A count plan already exists for year {0}")]
    DuplicatePlan(i32),

    /// Distribution produced a total or membership mismatch
    #[error("Distribution integrity check failed: {0}")]
    DistributionIntegrity(String),

    /// The (assignment, asset) pair already has a record; use update instead
    #[error("Asset {asset_id} has already been counted in assignment {assignment_id}")]
    AlreadyCounted { assignment_id: Uuid, asset_id: Uuid },

    #[error("Count record not found: {0}")]
    RecordNotFound(Uuid),

    /// Assignment confirmed or plan completed
    #[error("Assignment {0} is locked")]
    AssignmentLocked(Uuid),

    #[error("Assignment {assignment_id} is incomplete: {handled} of {assigned} assets handled")]
    IncompleteMonth {
        assignment_id: Uuid,
        handled: i64,
        assigned: i64,
    },

    #[error("Plan {plan_id} cannot be finalized: {confirmed} of {total} months confirmed")]
    PlanNotReady { plan_id: Uuid, confirmed: i64, total: i64 },

    #[error("Invalid plan year: {0}")]
    InvalidYear(i32),

    /// The registry-level inactive flag cannot be overridden from a count
    #[error("Asset {0} is inactive in the registry and cannot be reactivated from the count")]
    RegistryInactiveOverrideDenied(Uuid),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Asset {asset_id} is not part of assignment {assignment_id}")]
    AssetNotInAssignment { assignment_id: Uuid, asset_id: Uuid },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Plan {0} is completed")]
    PlanCompleted(Uuid),

    #[error("Plan {0} has no unconfirmed month left")]
    NoOpenMonth(Uuid),

    #[error("There are no active assets to distribute")]
    NoActiveAssets,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] activos_common::Error),
}

impl ConteoError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ConteoError::DuplicatePlan(_) => "DUPLICATE_PLAN",
            ConteoError::DistributionIntegrity(_) => "DISTRIBUTION_INTEGRITY_ERROR",
            ConteoError::AlreadyCounted { .. } => "ALREADY_COUNTED",
            ConteoError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            ConteoError::AssignmentLocked(_) => "ASSIGNMENT_LOCKED",
            ConteoError::IncompleteMonth { .. } => "INCOMPLETE_MONTH",
            ConteoError::PlanNotReady { .. } => "PLAN_NOT_READY",
            ConteoError::InvalidYear(_) => "INVALID_YEAR",
            ConteoError::RegistryInactiveOverrideDenied(_) => "REGISTRY_INACTIVE_OVERRIDE_DENIED",
            ConteoError::NotFound(_) => "NOT_FOUND",
            ConteoError::AssetNotInAssignment { .. } => "ASSET_NOT_IN_ASSIGNMENT",
            ConteoError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ConteoError::PlanCompleted(_) => "PLAN_COMPLETED",
            ConteoError::NoOpenMonth(_) => "NO_OPEN_MONTH",
            ConteoError::NoActiveAssets => "NO_ACTIVE_ASSETS",
            ConteoError::InvalidInput(_) => "INVALID_INPUT",
            ConteoError::Database(_) => "DATABASE_ERROR",
            ConteoError::Common(activos_common::Error::NotFound(_)) => "NOT_FOUND",
            ConteoError::Common(activos_common::Error::InvalidInput(_)) => "INVALID_INPUT",
            ConteoError::Common(_) => "COMMON_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ConteoError::RecordNotFound(_)
            | ConteoError::NotFound(_)
            | ConteoError::AssetNotInAssignment { .. }
            | ConteoError::Common(activos_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,

            ConteoError::DuplicatePlan(_)
            | ConteoError::AlreadyCounted { .. }
            | ConteoError::AssignmentLocked(_)
            | ConteoError::InvalidStateTransition { .. }
            | ConteoError::PlanCompleted(_)
            | ConteoError::NoOpenMonth(_) => StatusCode::CONFLICT,

            ConteoError::IncompleteMonth { .. }
            | ConteoError::PlanNotReady { .. }
            | ConteoError::NoActiveAssets
            | ConteoError::RegistryInactiveOverrideDenied(_) => StatusCode::UNPROCESSABLE_ENTITY,

            ConteoError::InvalidYear(_)
            | ConteoError::InvalidInput(_)
            | ConteoError::Common(activos_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,

            ConteoError::DistributionIntegrity(_)
            | ConteoError::Database(_)
            | ConteoError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ConteoError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for count-plan operations and API handlers
pub type ConteoResult<T> = Result<T, ConteoError>;
