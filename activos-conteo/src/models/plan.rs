//! Annual count plan
//!
//! A plan covers ten calendar months, September of the previous year through
//! June of the plan year. Its state only moves forward:
//! DRAFT → IN_PROGRESS → COMPLETED

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::assignment::AssignmentView;
use super::normalize_state;
use crate::error::{ConteoError, ConteoResult};

/// Number of monthly buckets in every plan
pub const MONTHS_PER_PLAN: u8 = 10;

/// Plan lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    Draft,
    InProgress,
    Completed,
}

impl PlanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanState::Draft => "draft",
            PlanState::InProgress => "in_progress",
            PlanState::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PlanState::Draft => 0,
            PlanState::InProgress => 1,
            PlanState::Completed => 2,
        }
    }

    /// Transitions are monotonic and step one state at a time
    pub fn can_transition_to(&self, next: PlanState) -> bool {
        next.rank() == self.rank() + 1
    }

    /// Validate a transition, producing the error the lifecycle reports
    pub fn ensure_transition(&self, next: PlanState) -> ConteoResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(ConteoError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanState {
    type Err = ConteoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_state(s).as_str() {
            "draft" | "borrador" => Ok(PlanState::Draft),
            "in_progress" | "en_progreso" => Ok(PlanState::InProgress),
            "completed" | "completado" => Ok(PlanState::Completed),
            other => Err(ConteoError::InvalidInput(format!("Unknown plan state '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualCountPlan {
    pub id: Uuid,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: PlanState,
    pub total_assets: i64,
    pub target_per_month: i64,
    pub tolerance_min: i64,
    pub tolerance_max: i64,
    pub created_by: String,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub finalization_reason: Option<String>,
}

/// Plan with its ten months
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: AnnualCountPlan,
    pub assignments: Vec<AssignmentView>,
}

/// Calendar (year, month) of a month index
///
/// Index 1 is September of `year - 1`, index 10 is June of `year`.
pub fn calendar_month(year: i32, month_index: u8) -> ConteoResult<(i32, u32)> {
    match month_index {
        1..=4 => Ok((year - 1, 8 + month_index as u32)),
        5..=10 => Ok((year, month_index as u32 - 4)),
        _ => Err(ConteoError::InvalidInput(format!(
            "Month index {} outside 1..={}",
            month_index, MONTHS_PER_PLAN
        ))),
    }
}

/// First and last day covered by the plan of `year`
pub fn plan_window(year: i32) -> ConteoResult<(NaiveDate, NaiveDate)> {
    let start = activos_common::time::first_day_of_month(year - 1, 9)?;
    let end = activos_common::time::last_day_of_month(year, 6)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse_is_case_insensitive() {
        assert_eq!("DRAFT".parse::<PlanState>().unwrap(), PlanState::Draft);
        assert_eq!(" In_Progress".parse::<PlanState>().unwrap(), PlanState::InProgress);
        assert_eq!("Completed".parse::<PlanState>().unwrap(), PlanState::Completed);
        assert!("archived".parse::<PlanState>().is_err());
    }

    #[test]
    fn test_transitions_are_monotonic() {
        assert!(PlanState::Draft.can_transition_to(PlanState::InProgress));
        assert!(PlanState::InProgress.can_transition_to(PlanState::Completed));
        assert!(!PlanState::Completed.can_transition_to(PlanState::InProgress));
        assert!(!PlanState::InProgress.can_transition_to(PlanState::Draft));
        assert!(!PlanState::Draft.can_transition_to(PlanState::Completed));
        assert!(PlanState::Completed.ensure_transition(PlanState::Completed).is_err());
    }

    #[test]
    fn test_calendar_months() {
        assert_eq!(calendar_month(2026, 1).unwrap(), (2025, 9));
        assert_eq!(calendar_month(2026, 4).unwrap(), (2025, 12));
        assert_eq!(calendar_month(2026, 5).unwrap(), (2026, 1));
        assert_eq!(calendar_month(2026, 10).unwrap(), (2026, 6));
        assert!(calendar_month(2026, 0).is_err());
        assert!(calendar_month(2026, 11).is_err());
    }

    #[test]
    fn test_plan_window() {
        let (start, end) = plan_window(2026).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
    }
}
