//! Count-plan domain models

pub mod assignment;
pub mod plan;
pub mod record;
pub mod stats;

pub use assignment::{AssignmentAsset, AssignmentState, AssignmentView, MonthlyAssignment};
pub use plan::{AnnualCountPlan, PlanDetail, PlanState, MONTHS_PER_PLAN};
pub use record::{CountInput, CountRecord, CountRecordPatch, DiscrepancyOutcome, DiscrepancyType, RecordState};
pub use stats::{AreaDiscrepancy, DiscrepancyBreakdown, PlanStats};

/// Canonical form of a state string: trimmed, lowercase, `_` separated
///
/// Stored and submitted states may differ in case; every parser goes
/// through here so no call site compares raw strings.
pub(crate) fn normalize_state(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['-', ' '], "_")
}
