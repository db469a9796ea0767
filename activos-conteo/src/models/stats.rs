//! Plan-level statistics (read side only)

use serde::Serialize;
use uuid::Uuid;

/// Discrepancies attributed to one registry area
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDiscrepancy {
    pub area_id: Uuid,
    pub area_name: String,
    pub discrepancy_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscrepancyBreakdown {
    pub ubicacion: i64,
    pub estado: i64,
    pub faltante: i64,
    pub otro: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub plan_id: Uuid,
    pub year: i32,
    pub total_assets: i64,
    pub total_assigned: i64,
    pub total_counted: i64,
    pub total_found: i64,
    pub total_missing: i64,
    pub total_discrepancies: i64,
    pub total_inactive_registry: i64,
    pub confirmed_months: i64,
    pub progress_percent: u8,
    pub found_rate: f64,
    pub missing_rate: f64,
    pub discrepancy_rate: f64,
    /// Population standard deviation of per-month counted counts
    pub counted_std_dev: f64,
    pub discrepancies_by_type: DiscrepancyBreakdown,
    pub top_areas: Vec<AreaDiscrepancy>,
}
