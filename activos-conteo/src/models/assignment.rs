//! Monthly assignment (asignación mensual)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::normalize_state;
use super::record::CountRecord;
use crate::error::ConteoError;

/// Month progress state
///
/// PENDIENTE until the first count, EN_PROGRESO while counting,
/// COMPLETADO once confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentState {
    Pendiente,
    EnProgreso,
    Completado,
}

impl AssignmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentState::Pendiente => "pendiente",
            AssignmentState::EnProgreso => "en_progreso",
            AssignmentState::Completado => "completado",
        }
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentState {
    type Err = ConteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_state(s).as_str() {
            "pendiente" | "pending" => Ok(AssignmentState::Pendiente),
            "en_progreso" | "in_progress" => Ok(AssignmentState::EnProgreso),
            "completado" | "completed" => Ok(AssignmentState::Completado),
            other => Err(ConteoError::InvalidInput(format!(
                "Unknown assignment state '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAssignment {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub month_index: u8,
    pub calendar_month: u32,
    pub year: i32,
    pub assigned_count: i64,
    pub state: AssignmentState,
    pub start_date: NaiveDate,
    pub deadline: NaiveDate,
    pub counted_count: i64,
    pub found_count: i64,
    pub missing_count: i64,
    pub discrepancy_count: i64,
    pub confirmed: bool,
    pub confirmed_by: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Assignment plus read-side progress
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: MonthlyAssignment,
    pub inactive_registry_count: i64,
    pub progress_percent: u8,
    pub fully_counted: bool,
}

/// One asset of a month with its registry state and count, if any
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentAsset {
    pub asset: activos_common::db::Asset,
    pub record: Option<CountRecord>,
}
