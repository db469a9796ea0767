//! Progress and discrepancy aggregation
//!
//! Read side only. The pure helpers are shared by the ledger (assignment
//! views) and the lifecycle controller (confirmation precondition).

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db::{assignments, plans, records};
use crate::error::{ConteoError, ConteoResult};
use crate::models::{
    AreaDiscrepancy, AssignmentView, DiscrepancyBreakdown, DiscrepancyType, MonthlyAssignment, PlanStats,
};

/// round(100 × handled / assigned), clamped to 0..=100; 0 for an empty month
pub fn progress_percent(counted: i64, inactive_registry: i64, assigned: i64) -> u8 {
    if assigned <= 0 {
        return 0;
    }
    let handled = (counted + inactive_registry).max(0) as f64;
    let percent = (100.0 * handled / assigned as f64).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Every assigned asset was counted or is inactive in the registry
pub fn is_fully_counted(counted: i64, inactive_registry: i64, assigned: i64) -> bool {
    assigned > 0 && counted + inactive_registry >= assigned
}

/// Ratio over `counted`; 0 when nothing was counted
pub fn rate(part: i64, counted: i64) -> f64 {
    if counted <= 0 {
        0.0
    } else {
        part as f64 / counted as f64
    }
}

/// Population standard deviation
pub fn population_std_dev(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<i64>() as f64 / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt()
}

/// Highest discrepancy counts first, ties by area name; keeps `top_n`
pub fn rank_areas(mut areas: Vec<AreaDiscrepancy>, top_n: usize) -> Vec<AreaDiscrepancy> {
    areas.sort_by(|a, b| {
        b.discrepancy_count
            .cmp(&a.discrepancy_count)
            .then_with(|| a.area_name.cmp(&b.area_name))
    });
    areas.truncate(top_n);
    areas
}

pub fn breakdown(counts: &[(DiscrepancyType, i64)]) -> DiscrepancyBreakdown {
    let mut result = DiscrepancyBreakdown::default();
    for (kind, count) in counts {
        match kind {
            DiscrepancyType::Ubicacion => result.ubicacion += count,
            DiscrepancyType::Estado => result.estado += count,
            DiscrepancyType::Faltante => result.faltante += count,
            DiscrepancyType::Otro => result.otro += count,
        }
    }
    result
}

/// Attach derived progress to an assignment
pub fn view_of(assignment: MonthlyAssignment, inactive_registry_count: i64) -> AssignmentView {
    let progress = progress_percent(
        assignment.counted_count,
        inactive_registry_count,
        assignment.assigned_count,
    );
    let fully_counted = is_fully_counted(
        assignment.counted_count,
        inactive_registry_count,
        assignment.assigned_count,
    );
    AssignmentView {
        assignment,
        inactive_registry_count,
        progress_percent: progress,
        fully_counted,
    }
}

/// Load an assignment with its derived progress
pub async fn assignment_view(conn: &mut SqliteConnection, assignment_id: Uuid) -> ConteoResult<AssignmentView> {
    let assignment = assignments::get_assignment(conn, assignment_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Assignment {}", assignment_id)))?;
    let inactive = assignments::inactive_registry_count(conn, assignment_id).await?;
    Ok(view_of(assignment, inactive))
}

/// The plan's months with derived progress, ordered by month index
pub async fn plan_views(conn: &mut SqliteConnection, plan_id: Uuid) -> ConteoResult<Vec<AssignmentView>> {
    let months = assignments::list_for_plan(conn, plan_id).await?;
    let mut views = Vec::with_capacity(months.len());
    for month in months {
        let inactive = assignments::inactive_registry_count(conn, month.id).await?;
        views.push(view_of(month, inactive));
    }
    Ok(views)
}

/// Plan-level statistics across all ten months
pub async fn plan_stats(conn: &mut SqliteConnection, plan_id: Uuid, top_n: usize) -> ConteoResult<PlanStats> {
    let plan = plans::get_plan(conn, plan_id)
        .await?
        .ok_or_else(|| ConteoError::NotFound(format!("Plan {}", plan_id)))?;

    let views = plan_views(conn, plan_id).await?;

    let sum = |f: fn(&AssignmentView) -> i64| views.iter().map(f).sum::<i64>();
    let total_assigned = sum(|v| v.assignment.assigned_count);
    let total_counted = sum(|v| v.assignment.counted_count);
    let total_found = sum(|v| v.assignment.found_count);
    let total_missing = sum(|v| v.assignment.missing_count);
    let total_discrepancies = sum(|v| v.assignment.discrepancy_count);
    let total_inactive_registry = sum(|v| v.inactive_registry_count);
    let confirmed_months = views.iter().filter(|v| v.assignment.confirmed).count() as i64;

    let per_month: Vec<i64> = views.iter().map(|v| v.assignment.counted_count).collect();

    let type_counts = records::discrepancy_type_counts(conn, plan_id).await?;
    let areas = records::discrepancy_area_counts(conn, plan_id)
        .await?
        .into_iter()
        .map(|(area_id, area_name, discrepancy_count)| AreaDiscrepancy {
            area_id,
            area_name,
            discrepancy_count,
        })
        .collect();

    tracing::debug!(plan_id = %plan_id, total_counted, confirmed_months, "Plan statistics computed");

    Ok(PlanStats {
        plan_id,
        year: plan.year,
        total_assets: plan.total_assets,
        total_assigned,
        total_counted,
        total_found,
        total_missing,
        total_discrepancies,
        total_inactive_registry,
        confirmed_months,
        progress_percent: progress_percent(total_counted, total_inactive_registry, total_assigned),
        found_rate: rate(total_found, total_counted),
        missing_rate: rate(total_missing, total_counted),
        discrepancy_rate: rate(total_discrepancies, total_counted),
        counted_std_dev: population_std_dev(&per_month),
        discrepancies_by_type: breakdown(&type_counts),
        top_areas: rank_areas(areas, top_n),
    })
}
